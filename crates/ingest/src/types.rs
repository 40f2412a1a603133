use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use streamstat_core::{PruneStats, RetentionCutoff};

/// Knobs of the poll-and-aggregate engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub interval_minutes: i64,
    pub stale_minutes: i64,
    pub keep_hourly_days: i64,
    pub keep_daily_days: i64,
    /// Retention runs on every Nth completed cycle; 0 disables it.
    pub retention_every: u64,
    pub follower_sync_hours: i64,
    pub follower_sync_days: i64,
    pub dedupe_logins_per_cycle: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            interval_minutes: 5,
            stale_minutes: 15,
            keep_hourly_days: 3,
            keep_daily_days: 365,
            retention_every: 12,
            follower_sync_hours: 48,
            follower_sync_days: 60,
            dedupe_logins_per_cycle: false,
        }
    }
}

impl EngineSettings {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs((self.interval_minutes.max(1) as u64).saturating_mul(60))
    }

    /// Horizons saturate at the earliest representable instant, keeping every row.
    pub fn retention_cutoff(&self, now: NaiveDateTime) -> RetentionCutoff {
        RetentionCutoff {
            hourly_before: days_before(now, self.keep_hourly_days),
            daily_before: days_before(now, self.keep_daily_days).date(),
        }
    }

    /// Whether the cycle following `completed` finished cycles should prune.
    pub fn retention_due(&self, completed: u64) -> bool {
        self.retention_every > 0 && (completed + 1) % self.retention_every == 0
    }
}

fn days_before(now: NaiveDateTime, days: i64) -> NaiveDateTime {
    Duration::try_days(days)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Where in a cycle a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum CycleStage {
    Warm,
    Fetch { page: usize },
    Apply { page: usize },
    Reconcile,
}

impl std::fmt::Display for CycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warm => write!(f, "warm"),
            Self::Fetch { page } => write!(f, "fetch page {}", page),
            Self::Apply { page } => write!(f, "apply page {}", page),
            Self::Reconcile => write!(f, "reconcile"),
        }
    }
}

/// Counters collected while a cycle runs; kept on failure for what was committed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub pages: usize,
    pub samples: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub spans_opened: usize,
    pub spans_closed: usize,
    pub span_conflicts: usize,
    pub offline_marked: usize,
    pub offline_spans_closed: usize,
    pub followers_synced: usize,
    pub retention: Option<PruneStats>,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleStats),
    Failed {
        stage: CycleStage,
        error: IngestError,
        stats: CycleStats,
    },
}

impl CycleOutcome {
    pub fn stats(&self) -> &CycleStats {
        match self {
            Self::Completed(stats) => stats,
            Self::Failed { stats, .. } => stats,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Errors emitted by the poller and the cycle engine.
#[derive(Debug)]
pub enum IngestError {
    Db(streamstat_db::DbError),
    Http(reqwest::Error),
    Status { status: u16, url: String },
    Unauthorized,
    Decode(serde_json::Error),
    Credentials(String),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "db error: {}", err),
            Self::Http(err) => write!(f, "http error: {}", err),
            Self::Status { status, url } => write!(f, "unexpected status {} from {}", status, url),
            Self::Unauthorized => write!(f, "access token rejected"),
            Self::Decode(err) => write!(f, "decode error: {}", err),
            Self::Credentials(message) => write!(f, "credentials error: {}", message),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Http(err) => Some(err),
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<streamstat_db::DbError> for IngestError {
    fn from(err: streamstat_db::DbError) -> Self {
        Self::Db(err)
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err)
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
