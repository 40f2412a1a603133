use chrono::NaiveDateTime;
use streamstat_core::{bucket_date, floor_to_hour, format_date, format_instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Hour,
    Day,
}

impl Bucket {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Self::Hour => "stream_agg_hourly",
            Self::Day => "stream_agg_daily",
        }
    }

    /// Stored key of the bucket containing `at`.
    pub fn key(&self, at: NaiveDateTime) -> String {
        match self {
            Self::Hour => format_instant(floor_to_hour(at)),
            Self::Day => format_date(bucket_date(at)),
        }
    }
}

/// Outcome of inserting a new span row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanInsert {
    Inserted,
    /// A span with the same (login, start) or another open span already exists.
    Conflict,
}

/// Channel handed to the enrichment collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentTarget {
    pub channel_id: String,
    pub login: String,
    pub peak_viewers: i64,
}
