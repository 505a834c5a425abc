use crate::config::ConfigError;
use std::path::{Path, PathBuf};

pub const GLOBAL_STATE_DIR: &str = ".haulbot";
pub const GLOBAL_SETTINGS_FILE_NAME: &str = "config.yaml";
pub const ORDERS_DB_FILE_NAME: &str = "orders.sqlite3";
pub const SESSIONS_DIR_NAME: &str = "sessions";

pub fn default_global_config_path() -> Result<PathBuf, ConfigError> {
    let home = std::env::var_os("HOME").ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home)
        .join(GLOBAL_STATE_DIR)
        .join(GLOBAL_SETTINGS_FILE_NAME))
}

/// Layout of everything the bot keeps under its state root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    root: PathBuf,
}

impl StatePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn orders_db_path(&self) -> PathBuf {
        self.root.join(ORDERS_DB_FILE_NAME)
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join(SESSIONS_DIR_NAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Presence of this file asks a running bot to shut down.
    pub fn stop_signal_path(&self) -> PathBuf {
        self.root.join("stop")
    }

    pub fn bootstrap(&self) -> Result<(), ConfigError> {
        for dir in [self.root.clone(), self.sessions_dir(), self.logs_dir()] {
            std::fs::create_dir_all(&dir).map_err(|source| ConfigError::CreateDir {
                path: dir.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}
