use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, params};
use streamstat_core::{ChannelSnapshot, LiveSample, format_instant};

use crate::Db;
use crate::error::{DbError, Result};
use crate::helpers::{SNAPSHOT_COLUMNS, get_instant, row_to_snapshot};
use crate::types::EnrichmentTarget;

/// Insert-or-update of the current-status row. `channel_id` is kept once known and
/// `started_at` is only replaced by a non-null value; enrichment columns are left alone.
pub(crate) fn upsert_current(
    conn: &Connection,
    sample: &LiveSample,
    captured_at: NaiveDateTime,
    is_live: bool,
) -> Result<()> {
    conn.prepare_cached(
        r#"
        INSERT INTO stream_current (
          channel_login, channel_id, captured_at, is_live, viewer_count,
          game_id, game_name, language, last_seen_at, started_at
        ) VALUES (
          ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?3, ?9
        )
        ON CONFLICT(channel_login) DO UPDATE SET
          channel_id = COALESCE(stream_current.channel_id, excluded.channel_id),
          captured_at = excluded.captured_at,
          is_live = excluded.is_live,
          viewer_count = excluded.viewer_count,
          game_id = excluded.game_id,
          game_name = excluded.game_name,
          language = excluded.language,
          last_seen_at = excluded.last_seen_at,
          started_at = COALESCE(excluded.started_at, stream_current.started_at)
        "#,
    )?
    .execute(params![
        sample.login,
        sample.channel_id,
        format_instant(captured_at),
        is_live as i64,
        sample.viewer_count.max(0),
        sample.game_id,
        sample.game_name,
        sample.language,
        sample.started_at.map(format_instant),
    ])?;
    Ok(())
}

pub(crate) fn mark_offline_if_stale(
    conn: &Connection,
    now: NaiveDateTime,
    stale_minutes: i64,
) -> Result<usize> {
    let cutoff = now - Duration::minutes(stale_minutes);
    let updated = conn.execute(
        r#"
        UPDATE stream_current
           SET is_live = 0, viewer_count = 0
         WHERE is_live = 1 AND last_seen_at < ?1
        "#,
        params![format_instant(cutoff)],
    )?;
    Ok(updated)
}

impl Db {
    pub fn get_current(&self, login: &str) -> Result<Option<ChannelSnapshot>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM stream_current WHERE channel_login = ?1",
                    SNAPSHOT_COLUMNS
                ),
                params![login],
                row_to_snapshot,
            )
            .optional()
            .map_err(DbError::from)
    }

    pub fn list_live(&self) -> Result<Vec<ChannelSnapshot>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM stream_current WHERE is_live = 1 ORDER BY viewer_count DESC, channel_login ASC",
            SNAPSHOT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], row_to_snapshot)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Last-seen instant per login, used to warm the cycle cache.
    pub fn last_seen_by_login(&self) -> Result<HashMap<String, NaiveDateTime>> {
        let mut stmt = self
            .conn
            .prepare("SELECT channel_login, last_seen_at FROM stream_current")?;
        let mut rows = stmt.query([])?;
        let mut out = HashMap::new();
        while let Some(row) = rows.next()? {
            out.insert(row.get::<_, String>(0)?, get_instant(row, 1)?);
        }
        Ok(out)
    }

    /// Channel ids for the enrichment collaborator, highest peak audience first.
    pub fn channels_for_enrichment(&self, limit: usize) -> Result<Vec<EnrichmentTarget>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT sc.channel_id, sc.channel_login, COALESCE(MAX(ad.max_viewers), 0) AS peak
            FROM stream_current sc
            LEFT JOIN stream_agg_daily ad ON ad.channel_login = sc.channel_login
            WHERE sc.channel_id IS NOT NULL
            GROUP BY sc.channel_login
            ORDER BY peak DESC, sc.channel_login ASC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(EnrichmentTarget {
                    channel_id: row.get(0)?,
                    login: row.get(1)?,
                    peak_viewers: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Enrichment write-back keyed by channel id. Null inputs keep the stored value.
    pub fn apply_channel_meta(
        &self,
        channel_id: &str,
        followers_total: Option<i64>,
        avatar_url: Option<&str>,
    ) -> Result<usize> {
        let updated = self.conn.execute(
            r#"
            UPDATE stream_current
               SET followers_total = COALESCE(?1, followers_total),
                   avatar_url = COALESCE(?2, avatar_url)
             WHERE channel_id = ?3
            "#,
            params![followers_total, avatar_url, channel_id],
        )?;
        Ok(updated)
    }
}
