use std::sync::mpsc::{Receiver, RecvTimeoutError};

use streamstat_db::Db;

use crate::cycle::Engine;
use crate::source::{CredentialSource, LiveSource};
use crate::types::{CycleOutcome, IngestError};

/// Result of one scheduler tick.
#[derive(Debug)]
pub enum SchedulerTick {
    Cycle(CycleOutcome),
    /// No token could be acquired, so the cycle never started.
    Skipped(IngestError),
}

/// Runs cycles back to back with a fixed sleep. Never exits on a cycle error.
pub struct Scheduler<S, C> {
    db: Db,
    engine: Engine,
    source: S,
    credentials: C,
    token: Option<String>,
    completed_cycles: u64,
}

impl<S: LiveSource, C: CredentialSource> Scheduler<S, C> {
    pub fn new(db: Db, engine: Engine, source: S, credentials: C) -> Self {
        Self {
            db,
            engine,
            source,
            credentials,
            token: None,
            completed_cycles: 0,
        }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn acquire_token(&mut self) -> Result<String, IngestError> {
        match self.credentials.acquire() {
            Ok(token) => {
                self.token = Some(token.clone());
                Ok(token)
            }
            Err(err) => {
                self.token = None;
                Err(err)
            }
        }
    }

    pub fn run_once(&mut self) -> SchedulerTick {
        let token = match self.token.clone() {
            Some(token) => token,
            None => match self.acquire_token() {
                Ok(token) => token,
                Err(err) => {
                    tracing::error!(error = %err, "no access token; skipping cycle");
                    return SchedulerTick::Skipped(err);
                }
            },
        };

        let run_retention = self.engine.settings().retention_due(self.completed_cycles);
        let outcome = self
            .engine
            .run_cycle(&mut self.db, &self.source, &token, run_retention);
        match &outcome {
            CycleOutcome::Completed(_) => {
                self.completed_cycles += 1;
            }
            CycleOutcome::Failed { stage, error, stats } => {
                tracing::error!(
                    %stage,
                    error = %error,
                    pages_committed = stats.pages,
                    "cycle failed; refreshing access token"
                );
                if let Err(err) = self.acquire_token() {
                    tracing::error!(error = %err, "access token refresh failed");
                }
            }
        }
        SchedulerTick::Cycle(outcome)
    }

    /// Loops until `shutdown` fires or its sender is dropped. The signal is
    /// observed while sleeping between cycles.
    pub fn run(&mut self, shutdown: &Receiver<()>) {
        let interval = self.engine.settings().interval();
        loop {
            self.run_once();
            tracing::info!(sleep_secs = interval.as_secs(), "sleeping until next cycle");
            match shutdown.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!(cycles = self.completed_cycles, "scheduler stopped");
                    break;
                }
            }
        }
    }
}
