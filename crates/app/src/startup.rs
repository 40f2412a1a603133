use std::path::PathBuf;

use crate::config::AppConfig;
use crate::error::{AppError, Result};

pub const DATA_DIR_ENV: &str = "STREAMSTAT_DATA_DIR";
pub const DB_FILE_NAME: &str = "streamstat.sqlite";
pub const CONFIG_FILE_NAME: &str = "streamstat.toml";
const DATA_DIR_NAME: &str = ".streamstat";

#[derive(Clone, Debug)]
pub struct AppPaths {
    pub app_data_dir: PathBuf,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl AppPaths {
    pub fn new(app_data_dir: PathBuf) -> Self {
        let db_path = app_data_dir.join(DB_FILE_NAME);
        let config_path = app_data_dir.join(CONFIG_FILE_NAME);
        Self {
            app_data_dir,
            db_path,
            config_path,
        }
    }

    pub fn with_config_path(mut self, config_path: PathBuf) -> Self {
        self.config_path = config_path;
        self
    }

    /// A database path from config wins over the data-dir default; relative
    /// paths resolve against the data dir.
    pub fn apply_config(mut self, config: &AppConfig) -> Self {
        if let Some(path) = &config.database_path {
            self.db_path = if path.is_absolute() {
                path.clone()
            } else {
                self.app_data_dir.join(path)
            };
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct DataDirResolution {
    pub dir: PathBuf,
    pub matched_existing: bool,
}

pub fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<DataDirResolution> {
    resolve_data_dir_with(explicit, |key| std::env::var(key).ok())
}

/// Explicit path, then `STREAMSTAT_DATA_DIR`, then `$HOME/.streamstat`.
pub fn resolve_data_dir_with(
    explicit: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<DataDirResolution> {
    let from_env = || {
        lookup(DATA_DIR_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    };
    let dir = match explicit.or_else(from_env) {
        Some(dir) => dir,
        None => {
            let home = lookup("HOME")
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| {
                    AppError::Config(format!("set {} or HOME to locate the data dir", DATA_DIR_ENV))
                })?;
            PathBuf::from(home).join(DATA_DIR_NAME)
        }
    };
    let matched_existing = dir.join(DB_FILE_NAME).exists();
    Ok(DataDirResolution {
        dir,
        matched_existing,
    })
}

pub fn ensure_app_data_dir(paths: &AppPaths) -> Result<()> {
    std::fs::create_dir_all(&paths.app_data_dir)?;
    if let Some(parent) = paths.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
