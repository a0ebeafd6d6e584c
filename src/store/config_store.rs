use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::paths;
use crate::config::CompilerConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Loads the compiler configuration.
///
/// An explicit `path` has to exist. Without one the default location is
/// tried, and a missing file there means the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<CompilerConfig, ConfigError> {
    if let Some(path) = path {
        return read_config(path);
    }
    let Some(path) = paths::default_config_path() else {
        tracing::debug!("no configuration directory, using defaults");
        return Ok(CompilerConfig::default());
    };
    match read_config(&path) {
        Err(ConfigError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            Ok(CompilerConfig::default())
        }
        other => other,
    }
}

fn read_config(path: &Path) -> Result<CompilerConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_json::from_str(&data).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

pub fn save_config(path: &Path, config: &CompilerConfig) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let data = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, data).map_err(io_err)
}
