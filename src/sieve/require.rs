/// The requirement gate.
///
/// A script declares the extensions it uses in its leading `require`
/// statements. Declarations are checked against the host's registry; every
/// extension-governed construct later asks the gate before it is accepted.
use crate::config::CompilerConfig;
use crate::model::enums::Extension;
use crate::model::script::SieveScript;
use crate::sieve::error::CompileError;

/// Tells the compiler which extensions this deployment can execute.
pub trait ExtensionRegistry {
    fn is_extension_supported(&self, name: &str) -> bool;
}

impl ExtensionRegistry for CompilerConfig {
    fn is_extension_supported(&self, name: &str) -> bool {
        self.supports(name)
    }
}

impl<F> ExtensionRegistry for F
where
    F: Fn(&str) -> bool,
{
    fn is_extension_supported(&self, name: &str) -> bool {
        self(name)
    }
}

impl SieveScript<'_> {
    /// Registers one `require` entry.
    pub fn declare(&mut self, name: &str) -> Result<Extension, CompileError> {
        let supported = Extension::from_sieve(name)
            .filter(|_| self.registry().is_extension_supported(name));
        match supported {
            Some(ext) => {
                tracing::debug!(extension = %ext, "extension declared");
                self.declared.insert(ext);
                Ok(ext)
            }
            None => Err(CompileError::UnsupportedExtension(name.to_string())),
        }
    }

    /// Whether `ext` was declared and is still supported by the host.
    pub fn has(&self, ext: Extension) -> bool {
        self.declared.contains(&ext) && self.registry().is_extension_supported(ext.as_sieve())
    }

    /// Gate for a construct governed by `ext`.
    pub fn require(&self, ext: Extension) -> Result<(), CompileError> {
        if self.has(ext) {
            Ok(())
        } else {
            tracing::debug!(extension = %ext, "construct used without its extension");
            Err(CompileError::ExtensionNotEnabled(ext))
        }
    }
}
