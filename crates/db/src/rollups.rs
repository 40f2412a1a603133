use chrono::{Duration, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, params};
use streamstat_core::{
    LiveSample, PruneStats, RetentionCutoff, RollupContribution, RollupRow, format_date,
    format_instant,
};

use crate::Db;
use crate::error::{DbError, Result};
use crate::helpers::{ROLLUP_COLUMNS, row_to_rollup};
use crate::types::Bucket;

/// Additive merge of one sample into its bucket. Not idempotent: every call counts.
pub(crate) fn accumulate(
    conn: &Connection,
    bucket: Bucket,
    sample: &LiveSample,
    now: NaiveDateTime,
    contribution: &RollupContribution,
) -> Result<()> {
    let table = bucket.table();
    conn.prepare_cached(&format!(
        r#"
        INSERT INTO {table} (
          channel_login, channel_id, bucket_start, sum_viewers, sample_count, max_viewers,
          minutes_streamed, watched_minutes, followers_latest, last_seen_at
        ) VALUES (
          ?1, ?2, ?3, ?4, 1, ?4, ?5, ?6, NULL, ?7
        )
        ON CONFLICT(channel_login, bucket_start) DO UPDATE SET
          channel_id = COALESCE(excluded.channel_id, {table}.channel_id),
          sum_viewers = {table}.sum_viewers + excluded.sum_viewers,
          sample_count = {table}.sample_count + 1,
          max_viewers = MAX({table}.max_viewers, excluded.max_viewers),
          minutes_streamed = {table}.minutes_streamed + excluded.minutes_streamed,
          watched_minutes = {table}.watched_minutes + excluded.watched_minutes,
          last_seen_at = excluded.last_seen_at
        "#
    ))?
    .execute(params![
        sample.login,
        sample.channel_id,
        bucket.key(now),
        contribution.viewers,
        contribution.minutes,
        contribution.watched_minutes,
        format_instant(now),
    ])?;
    Ok(())
}

/// Copies the enrichment-owned follower total into recent rollup rows.
/// Rows keep their previous value while the channel has no known total.
pub(crate) fn sync_followers(
    conn: &Connection,
    now: NaiveDateTime,
    hourly_hours: i64,
    daily_days: i64,
) -> Result<usize> {
    let windows = [
        (Bucket::Hour, Bucket::Hour.key(now - Duration::hours(hourly_hours))),
        (Bucket::Day, Bucket::Day.key(now - Duration::days(daily_days))),
    ];
    let mut updated = 0usize;
    for (bucket, since) in windows {
        let table = bucket.table();
        updated += conn.execute(
            &format!(
                r#"
                UPDATE {table}
                   SET followers_latest = (
                     SELECT sc.followers_total
                     FROM stream_current sc
                     WHERE sc.channel_login = {table}.channel_login
                   )
                 WHERE bucket_start >= ?1
                   AND EXISTS (
                     SELECT 1 FROM stream_current sc
                     WHERE sc.channel_login = {table}.channel_login
                       AND sc.followers_total IS NOT NULL
                   )
                "#
            ),
            params![since],
        )?;
    }
    Ok(updated)
}

pub(crate) fn prune_rollups(conn: &Connection, cutoff: &RetentionCutoff) -> Result<PruneStats> {
    let hourly_deleted = conn.execute(
        "DELETE FROM stream_agg_hourly WHERE bucket_start < ?1",
        params![format_instant(cutoff.hourly_before)],
    )?;
    let daily_deleted = conn.execute(
        "DELETE FROM stream_agg_daily WHERE bucket_start < ?1",
        params![format_date(cutoff.daily_before)],
    )?;
    Ok(PruneStats {
        hourly_deleted,
        daily_deleted,
    })
}

impl Db {
    pub fn get_rollup(
        &self,
        bucket: Bucket,
        login: &str,
        at: NaiveDateTime,
    ) -> Result<Option<RollupRow>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE channel_login = ?1 AND bucket_start = ?2",
                    ROLLUP_COLUMNS,
                    bucket.table()
                ),
                params![login, bucket.key(at)],
                |row| row_to_rollup(row, bucket),
            )
            .optional()
            .map_err(DbError::from)
    }

    pub fn list_rollups(&self, bucket: Bucket, login: &str) -> Result<Vec<RollupRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} WHERE channel_login = ?1 ORDER BY bucket_start ASC",
            ROLLUP_COLUMNS,
            bucket.table()
        ))?;
        let rows = stmt
            .query_map(params![login], |row| row_to_rollup(row, bucket))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_rollups(&self, bucket: Bucket) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", bucket.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}
