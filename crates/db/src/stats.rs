use std::collections::HashMap;

use chrono::NaiveDateTime;
use rusqlite::{Row, params};
use streamstat_core::{ChannelStats, GameMinutes, StatsRange};

use crate::Db;
use crate::error::Result;
use crate::helpers::get_opt_instant;
use crate::types::Bucket;

fn range_source(range: StatsRange, now: NaiveDateTime) -> (Bucket, String) {
    let bucket = if range.uses_hourly() {
        Bucket::Hour
    } else {
        Bucket::Day
    };
    let since = range
        .start(now)
        .map(|start| bucket.key(start))
        .unwrap_or_default();
    (bucket, since)
}

const STATS_SELECT: &str = r#"
    SELECT r.channel_login,
           SUM(r.sum_viewers), SUM(r.sample_count), MAX(r.max_viewers),
           SUM(r.minutes_streamed), SUM(r.watched_minutes),
           MAX(r.followers_latest), MAX(r.last_seen_at),
           sc.is_live, sc.viewer_count, sc.language, sc.game_name, sc.avatar_url
    FROM {table} r
    LEFT JOIN stream_current sc ON sc.channel_login = r.channel_login
"#;

fn row_to_stats(row: &Row<'_>) -> rusqlite::Result<ChannelStats> {
    let sum_viewers: i64 = row.get(1)?;
    let samples: i64 = row.get(2)?;
    let watched: i64 = row.get(5)?;
    let is_live = row.get::<_, Option<i64>>(8)?.unwrap_or(0) != 0;
    let current_viewers: Option<i64> = row.get(9)?;
    Ok(ChannelStats {
        login: row.get(0)?,
        avg_viewers: if samples > 0 {
            sum_viewers as f64 / samples as f64
        } else {
            0.0
        },
        max_viewers: row.get(3)?,
        minutes_streamed: row.get(4)?,
        hours_watched: watched as f64 / 60.0,
        followers_latest: row.get(6)?,
        last_seen_at: get_opt_instant(row, 7)?,
        is_live,
        current_viewers: current_viewers.filter(|_| is_live),
        current_language: row.get(10)?,
        current_game: row.get(11)?,
        avatar_url: row.get(12)?,
    })
}

impl Db {
    pub fn channel_stats(
        &self,
        login: &str,
        range: StatsRange,
        now: NaiveDateTime,
    ) -> Result<Option<ChannelStats>> {
        let (bucket, since) = range_source(range, now);
        let sql = format!(
            "{} WHERE r.channel_login = ?1 AND r.bucket_start >= ?2 GROUP BY r.channel_login",
            STATS_SELECT.replace("{table}", bucket.table())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![login, since])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_stats(row)?)),
            None => Ok(None),
        }
    }

    /// Channels ordered by hours watched within the range.
    pub fn top_channels(
        &self,
        range: StatsRange,
        now: NaiveDateTime,
        limit: usize,
    ) -> Result<Vec<ChannelStats>> {
        let (bucket, since) = range_source(range, now);
        let sql = format!(
            "{} WHERE r.bucket_start >= ?1 GROUP BY r.channel_login \
             ORDER BY SUM(r.watched_minutes) DESC, r.channel_login ASC LIMIT ?2",
            STATS_SELECT.replace("{table}", bucket.table())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![since, limit as i64], row_to_stats)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Minutes per category from spans overlapping the range; open spans run until `now`.
    pub fn game_minutes(
        &self,
        login: &str,
        range: StatsRange,
        now: NaiveDateTime,
    ) -> Result<Vec<GameMinutes>> {
        let start = range.start(now);
        let spans = self.spans_for_login(login)?;
        let mut totals: HashMap<(Option<String>, Option<String>), i64> = HashMap::new();
        for span in spans {
            let from = match start {
                Some(start) => span.start_at.max(start),
                None => span.start_at,
            };
            let to = span.end_at.unwrap_or(now).min(now);
            if to <= from {
                continue;
            }
            let minutes = (to - from).num_minutes();
            *totals.entry((span.game_id, span.game_name)).or_default() += minutes;
        }
        let mut out: Vec<GameMinutes> = totals
            .into_iter()
            .filter(|(_, minutes)| *minutes > 0)
            .map(|((game_id, game_name), minutes)| GameMinutes {
                game_id,
                game_name,
                minutes,
            })
            .collect();
        out.sort_by(|a, b| {
            b.minutes
                .cmp(&a.minutes)
                .then_with(|| a.game_name.cmp(&b.game_name))
        });
        Ok(out)
    }
}
