mod maintenance;
mod poller;
mod stats;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use streamstat_core::LocalZone;
use streamstat_db::Db;

pub use maintenance::MaintenanceService;
pub use poller::{HelixScheduler, IngestService};
pub use stats::{ChannelReport, StatsService};

/// What every service needs: where the database lives and how to read time.
#[derive(Debug)]
pub struct ServiceContext {
    pub db_path: PathBuf,
    pub zone: LocalZone,
    pub config: AppConfig,
}

type SharedContext = Arc<ServiceContext>;

/// Service registry for app-level operations.
#[derive(Clone)]
pub struct AppServices {
    pub stats: StatsService,
    pub ingest: IngestService,
    pub maintenance: MaintenanceService,
}

impl AppServices {
    pub fn new(context: SharedContext) -> Self {
        Self {
            stats: StatsService::new(context.clone()),
            ingest: IngestService::new(context.clone()),
            maintenance: MaintenanceService::new(context),
        }
    }
}

fn open_db(context: &SharedContext) -> Result<Db> {
    Ok(Db::open(&context.db_path)?)
}

/// Channel logins are matched lowercase, as the live API reports them.
fn normalize_login(login: &str) -> Result<String> {
    let login = login.trim().to_ascii_lowercase();
    if login.is_empty() {
        return Err(AppError::InvalidInput("channel login is required".to_string()));
    }
    Ok(login)
}

fn missing_channel(login: &str) -> AppError {
    AppError::NotFound(format!("no data for channel {}", login))
}
