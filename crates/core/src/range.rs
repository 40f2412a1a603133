use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Reporting window for channel stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsRange {
    #[default]
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "all")]
    AllTime,
}

impl StatsRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Last24Hours => "24h",
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::AllTime => "all",
        }
    }

    /// First local instant covered by the range, `None` for all time.
    /// Multi-day ranges start at local midnight so they line up with daily buckets.
    pub fn start(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::Last24Hours => Some(now - Duration::hours(24)),
            Self::Last7Days => Some((now.date() - Duration::days(7)).and_time(NaiveTime::MIN)),
            Self::Last30Days => Some((now.date() - Duration::days(30)).and_time(NaiveTime::MIN)),
            Self::AllTime => None,
        }
    }

    /// Whether the range is answered from hourly rather than daily rollups.
    pub fn uses_hourly(&self) -> bool {
        matches!(self, Self::Last24Hours)
    }
}

impl FromStr for StatsRange {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "24h" | "day" => Ok(Self::Last24Hours),
            "7d" | "week" => Ok(Self::Last7Days),
            "30d" | "month" => Ok(Self::Last30Days),
            "all" | "alltime" => Ok(Self::AllTime),
            other => Err(format!("unsupported range {}", other)),
        }
    }
}

impl fmt::Display for StatsRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
