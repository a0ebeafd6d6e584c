use std::collections::BTreeSet;
use std::fmt;

use crate::config::CompilerConfig;
use crate::model::enums::Extension;
use crate::sieve::address::{AddrSpecValidator, AddressValidator};
use crate::sieve::error::{CompileError, Diagnostic};
use crate::sieve::require::ExtensionRegistry;

/// Per-compilation state: the host collaborators, the extensions the script
/// declared, and the number of errors reported so far.
///
/// One handle is owned by one compilation at a time. Create a fresh handle
/// (or call [`SieveScript::reset`]) before compiling another script.
pub struct SieveScript<'h> {
    config: CompilerConfig,
    registry: Box<dyn ExtensionRegistry + 'h>,
    addresses: Box<dyn AddressValidator + 'h>,
    on_error: Box<dyn FnMut(&Diagnostic) + 'h>,
    pub(crate) declared: BTreeSet<Extension>,
    err_count: usize,
}

impl<'h> SieveScript<'h> {
    /// A handle whose supported extensions come from `config`.
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            registry: Box::new(config.clone()),
            config,
            addresses: Box::new(AddrSpecValidator),
            on_error: Box::new(|_| {}),
            declared: BTreeSet::new(),
            err_count: 0,
        }
    }

    pub fn with_registry(mut self, registry: impl ExtensionRegistry + 'h) -> Self {
        self.registry = Box::new(registry);
        self
    }

    pub fn with_address_validator(mut self, validator: impl AddressValidator + 'h) -> Self {
        self.addresses = Box::new(validator);
        self
    }

    /// Installs the callback invoked once per reported defect.
    pub fn on_error(mut self, callback: impl FnMut(&Diagnostic) + 'h) -> Self {
        self.on_error = Box::new(callback);
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn err_count(&self) -> usize {
        self.err_count
    }

    /// Extensions successfully declared by the script's `require` block.
    pub fn declared(&self) -> impl Iterator<Item = Extension> + '_ {
        self.declared.iter().copied()
    }

    pub fn reset(&mut self) {
        self.declared.clear();
        self.err_count = 0;
    }

    pub(crate) fn registry(&self) -> &dyn ExtensionRegistry {
        self.registry.as_ref()
    }

    pub(crate) fn is_valid_address(&self, address: &str) -> bool {
        self.addresses.is_valid_address(address)
    }

    /// Counts the error and hands it to the diagnostic callback.
    pub(crate) fn report(&mut self, line: usize, error: CompileError) {
        self.err_count += 1;
        let diagnostic = Diagnostic { line, error };
        tracing::debug!(%diagnostic, "compile error");
        (self.on_error)(&diagnostic);
    }
}

impl fmt::Debug for SieveScript<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SieveScript")
            .field("config", &self.config)
            .field("declared", &self.declared)
            .field("err_count", &self.err_count)
            .finish_non_exhaustive()
    }
}
