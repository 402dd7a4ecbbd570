use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::config::ConfigError;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Per-user configuration directory. Not created here; saving the config
/// creates it on demand.
pub fn config_directory() -> Result<PathBuf, ConfigError> {
    let project_dirs = ProjectDirs::from("org", "restaurant-recs", "restaurant-recs")
        .ok_or(ConfigError::DirectoryError)?;
    Ok(project_dirs.config_dir().to_path_buf())
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}
