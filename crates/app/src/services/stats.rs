use chrono::NaiveDateTime;
use serde::Serialize;
use streamstat_core::{ChannelStats, GameMinutes, GameSpan, StatsRange};
use streamstat_db::Db;

use crate::error::Result;
use crate::services::{SharedContext, missing_channel, normalize_login, open_db};

/// Channel aggregate plus its category breakdown for one range.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelReport {
    pub range: StatsRange,
    #[serde(flatten)]
    pub stats: ChannelStats,
    pub games: Vec<GameMinutes>,
}

#[derive(Clone)]
pub struct StatsService {
    context: SharedContext,
}

impl StatsService {
    pub(super) fn new(context: SharedContext) -> Self {
        Self { context }
    }

    fn db(&self) -> Result<Db> {
        open_db(&self.context)
    }

    pub fn channel_report(
        &self,
        login: &str,
        range: StatsRange,
        now: NaiveDateTime,
    ) -> Result<ChannelReport> {
        let login = normalize_login(login)?;
        let db = self.db()?;
        let stats = db
            .channel_stats(&login, range, now)?
            .ok_or_else(|| missing_channel(&login))?;
        let games = db.game_minutes(&login, range, now)?;
        Ok(ChannelReport {
            range,
            stats,
            games,
        })
    }

    pub fn top_channels(
        &self,
        range: StatsRange,
        now: NaiveDateTime,
        limit: usize,
    ) -> Result<Vec<ChannelStats>> {
        Ok(self.db()?.top_channels(range, now, limit.max(1))?)
    }

    pub fn recent_spans(&self, login: &str, limit: usize) -> Result<Vec<GameSpan>> {
        let login = normalize_login(login)?;
        let spans = self.db()?.recent_spans(&login, limit.max(1))?;
        if spans.is_empty() {
            return Err(missing_channel(&login));
        }
        Ok(spans)
    }
}
