pub mod paths;
pub mod settings;

pub use settings::{CompilerConfig, VacationLimits};
