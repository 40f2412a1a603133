use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

mod delta;
mod range;
mod span;
mod time;

pub use delta::{MAX_DELTA_MINUTES, MIN_DELTA_MINUTES, estimate_minutes};
pub use range::StatsRange;
pub use span::{OpenSpan, SpanState, SpanTransition};
pub use time::{
    DATE_FORMAT, INSTANT_FORMAT, LocalZone, bucket_date, floor_to_hour, format_date,
    format_instant, parse_date, parse_instant,
};

/// One live session reported by a poll, normalized to local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSample {
    pub login: String,
    pub channel_id: Option<String>,
    pub viewer_count: i64,
    pub game_id: Option<String>,
    pub game_name: Option<String>,
    pub language: Option<String>,
    pub started_at: Option<NaiveDateTime>,
}

/// Current-status row kept per channel login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub login: String,
    pub channel_id: Option<String>,
    pub captured_at: NaiveDateTime,
    pub is_live: bool,
    pub viewer_count: i64,
    pub game_id: Option<String>,
    pub game_name: Option<String>,
    pub language: Option<String>,
    pub last_seen_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub followers_total: Option<i64>,
    pub avatar_url: Option<String>,
}

/// Per-sample contribution merged into a rollup bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupContribution {
    pub viewers: i64,
    pub minutes: i64,
    pub watched_minutes: i64,
}

impl RollupContribution {
    pub fn new(viewers: i64, minutes: i64) -> Self {
        let viewers = viewers.max(0);
        Self {
            viewers,
            minutes,
            watched_minutes: viewers.saturating_mul(minutes),
        }
    }
}

/// Accumulated hourly or daily bucket. Daily buckets start at local midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupRow {
    pub login: String,
    pub channel_id: Option<String>,
    pub bucket_start: NaiveDateTime,
    pub sum_viewers: i64,
    pub sample_count: i64,
    pub max_viewers: i64,
    pub minutes_streamed: i64,
    pub watched_minutes: i64,
    pub followers_latest: Option<i64>,
    pub last_seen_at: NaiveDateTime,
}

impl RollupRow {
    pub fn avg_viewers(&self) -> Option<f64> {
        if self.sample_count <= 0 {
            return None;
        }
        Some(self.sum_viewers as f64 / self.sample_count as f64)
    }
}

/// Contiguous interval during which a channel stayed on one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSpan {
    pub id: i64,
    pub login: String,
    pub channel_id: Option<String>,
    pub game_id: Option<String>,
    pub game_name: Option<String>,
    pub start_at: NaiveDateTime,
    pub end_at: Option<NaiveDateTime>,
}

impl GameSpan {
    pub fn is_open(&self) -> bool {
        self.end_at.is_none()
    }
}

/// Aggregated viewership for one channel over a stats range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub login: String,
    pub avg_viewers: f64,
    pub max_viewers: i64,
    pub minutes_streamed: i64,
    pub hours_watched: f64,
    pub followers_latest: Option<i64>,
    pub last_seen_at: Option<NaiveDateTime>,
    pub is_live: bool,
    pub current_viewers: Option<i64>,
    pub current_language: Option<String>,
    pub current_game: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMinutes {
    pub game_id: Option<String>,
    pub game_name: Option<String>,
    pub minutes: i64,
}

/// Retention cut-offs applied by a prune pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionCutoff {
    pub hourly_before: NaiveDateTime,
    pub daily_before: NaiveDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneStats {
    pub hourly_deleted: usize,
    pub daily_deleted: usize,
}
