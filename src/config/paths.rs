use directories::ProjectDirs;
use std::path::PathBuf;

const CONFIG_FILE: &str = "config.json";

pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "Sievec").map(|d| d.config_dir().to_path_buf())
}

/// Where the compiler configuration lives when no path is given.
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(CONFIG_FILE))
}
