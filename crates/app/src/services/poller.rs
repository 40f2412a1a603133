use std::sync::mpsc::Receiver;

use ingest::{Engine, HelixClient, Scheduler, SchedulerTick, SystemClock};

use crate::error::Result;
use crate::services::{SharedContext, open_db};

pub type HelixScheduler = Scheduler<HelixClient, HelixClient>;

#[derive(Clone)]
pub struct IngestService {
    context: SharedContext,
}

impl IngestService {
    pub(super) fn new(context: SharedContext) -> Self {
        Self { context }
    }

    /// Builds the blocking scheduler. Must run off the async runtime.
    pub fn scheduler(&self) -> Result<HelixScheduler> {
        let mut db = open_db(&self.context)?;
        db.migrate()?;
        let client = HelixClient::new(self.context.config.helix_config())?;
        let engine = Engine::new(
            self.context.zone,
            Box::new(SystemClock),
            self.context.config.engine_settings(),
        );
        Ok(Scheduler::new(db, engine, client.clone(), client))
    }

    pub fn run_once(&self) -> Result<SchedulerTick> {
        let mut scheduler = self.scheduler()?;
        Ok(scheduler.run_once())
    }

    /// Runs cycles until `shutdown` fires.
    pub fn run(&self, shutdown: &Receiver<()>) -> Result<()> {
        let mut scheduler = self.scheduler()?;
        tracing::info!(
            zone = self.context.zone.name(),
            interval_minutes = scheduler.engine().settings().interval_minutes,
            "scheduler started"
        );
        scheduler.run(shutdown);
        Ok(())
    }
}
