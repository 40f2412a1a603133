use chrono::NaiveDateTime;
use streamstat_core::PruneStats;

use crate::error::Result;
use crate::services::{SharedContext, open_db};

#[derive(Clone)]
pub struct MaintenanceService {
    context: SharedContext,
}

impl MaintenanceService {
    pub(super) fn new(context: SharedContext) -> Self {
        Self { context }
    }

    /// Runs the retention sweep immediately, outside the cycle cadence.
    pub fn prune(&self, now: NaiveDateTime) -> Result<PruneStats> {
        let cutoff = self.context.config.engine_settings().retention_cutoff(now);
        let mut db = open_db(&self.context)?;
        let batch = db.begin_batch()?;
        let pruned = batch.prune_rollups(&cutoff)?;
        batch.commit()?;
        tracing::info!(
            hourly_deleted = pruned.hourly_deleted,
            daily_deleted = pruned.daily_deleted,
            "manual retention sweep done"
        );
        Ok(pruned)
    }
}
