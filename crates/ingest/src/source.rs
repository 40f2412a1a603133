use chrono::NaiveDateTime;
use serde::Deserialize;
use streamstat_core::{LiveSample, LocalZone};

use crate::types::Result;

/// One live-stream record as reported by the live-session API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamRecord {
    #[serde(default)]
    pub user_login: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub viewer_count: i64,
    #[serde(default)]
    pub game_id: Option<String>,
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl StreamRecord {
    /// Normalizes the record into local time. Records without a login yield `None`.
    pub fn to_sample(&self, zone: &LocalZone) -> Option<LiveSample> {
        let login = self.user_login.trim();
        if login.is_empty() {
            return None;
        }
        let started_at: Option<NaiveDateTime> = self
            .started_at
            .as_deref()
            .and_then(|value| zone.parse_source_instant(value));
        Some(LiveSample {
            login: login.to_string(),
            channel_id: non_empty(&self.user_id),
            viewer_count: self.viewer_count.max(0),
            game_id: non_empty(&self.game_id),
            game_name: non_empty(&self.game_name),
            language: non_empty(&self.language),
            started_at,
        })
    }
}

/// One page of live streams plus the continuation cursor, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamPage {
    pub streams: Vec<StreamRecord>,
    pub cursor: Option<String>,
}

pub trait LiveSource {
    fn fetch_page(&self, token: &str, cursor: Option<&str>) -> Result<StreamPage>;
}

pub trait CredentialSource {
    fn acquire(&self) -> Result<String>;
}
