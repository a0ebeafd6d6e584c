use serde::{Deserialize, Serialize};

use crate::model::enums::Extension;

/// Deployment settings the compiler consults while validating a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// RFC 3028 strict mode: restrict `address` to address-bearing headers
    /// and `envelope` to `from`, `to` and `auth`.
    pub strict: bool,
    pub vacation: VacationLimits,
    /// Extension names this deployment supports.
    pub extensions: Vec<String>,
    /// Deepest nesting of blocks and tests accepted before compilation is
    /// aborted.
    pub max_nesting: usize,
}

const DEFAULT_MAX_NESTING: usize = 64;

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            strict: true,
            vacation: VacationLimits::default(),
            extensions: Extension::ALL
                .iter()
                .map(|ext| ext.as_sieve().to_string())
                .collect(),
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

impl CompilerConfig {
    pub fn supports(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| ext == name)
    }
}

/// Bounds of the vacation response window, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VacationLimits {
    pub min_days: u64,
    pub max_days: u64,
    pub default_days: u64,
}

impl Default for VacationLimits {
    fn default() -> Self {
        Self {
            min_days: 1,
            max_days: 30,
            default_days: 7,
        }
    }
}

impl VacationLimits {
    /// Fills in the default and clamps into `[min_days, max_days]`.
    pub fn resolve(&self, days: Option<u64>) -> u64 {
        let days = days.unwrap_or(self.default_days);
        days.max(self.min_days).min(self.max_days)
    }
}
