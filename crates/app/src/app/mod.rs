use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use streamstat_core::LocalZone;
use streamstat_db::Db;

use crate::config::AppConfig;
use crate::error::Result;
use crate::services::{AppServices, ServiceContext};
use crate::startup::AppPaths;

/// Resolved config plus the services built on it, shared by CLI commands.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub paths: AppPaths,
    pub zone: LocalZone,
    pub services: AppServices,
}

impl AppState {
    pub fn new(paths: AppPaths, config: AppConfig) -> Result<Self> {
        config.validate()?;
        let zone = config.zone()?;
        let context = Arc::new(ServiceContext {
            db_path: paths.db_path.clone(),
            zone,
            config: config.clone(),
        });
        let services = AppServices::new(context);
        Ok(Self {
            config,
            paths,
            zone,
            services,
        })
    }

    pub fn setup_db(&self) -> Result<()> {
        setup_db(&self.paths.db_path)
    }

    pub fn open_db(&self) -> Result<Db> {
        Ok(Db::open(&self.paths.db_path)?)
    }

    /// Current wall-clock time in the configured zone.
    pub fn now(&self) -> NaiveDateTime {
        self.zone.normalize(Utc::now())
    }
}

pub fn setup_db(path: &Path) -> Result<()> {
    let mut db = Db::open(path)?;
    db.migrate()?;
    Ok(())
}
