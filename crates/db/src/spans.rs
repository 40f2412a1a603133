use std::collections::HashMap;

use chrono::NaiveDateTime;
use rusqlite::{Connection, ErrorCode, params};
use streamstat_core::{GameSpan, LiveSample, OpenSpan, format_instant};

use crate::Db;
use crate::error::Result;
use crate::helpers::{SPAN_COLUMNS, get_instant, get_opt_instant, row_to_span};
use crate::types::SpanInsert;

pub(crate) fn insert_span(
    conn: &Connection,
    sample: &LiveSample,
    start_at: NaiveDateTime,
) -> Result<SpanInsert> {
    let result = conn
        .prepare_cached(
            r#"
            INSERT INTO stream_game_span (
              channel_login, channel_id, game_id, game_name, start_at, end_at
            ) VALUES (
              ?1, ?2, ?3, ?4, ?5, NULL
            )
            "#,
        )?
        .execute(params![
            sample.login,
            sample.channel_id,
            sample.game_id,
            sample.game_name,
            format_instant(start_at),
        ]);
    match result {
        Ok(_) => Ok(SpanInsert::Inserted),
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
            Ok(SpanInsert::Conflict)
        }
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn close_open_span(conn: &Connection, login: &str, at: NaiveDateTime) -> Result<usize> {
    let updated = conn
        .prepare_cached(
            r#"
            UPDATE stream_game_span
               SET end_at = ?1
             WHERE channel_login = ?2 AND end_at IS NULL
            "#,
        )?
        .execute(params![format_instant(at), login])?;
    Ok(updated)
}

/// Latest end instant among a login's closed spans.
pub(crate) fn latest_span_end(conn: &Connection, login: &str) -> Result<Option<NaiveDateTime>> {
    let mut stmt = conn.prepare_cached(
        "SELECT MAX(end_at) FROM stream_game_span WHERE channel_login = ?1",
    )?;
    let value = stmt.query_row(params![login], |row| get_opt_instant(row, 0))?;
    Ok(value)
}

/// Latest start instant among all of a login's spans.
pub(crate) fn latest_span_start(conn: &Connection, login: &str) -> Result<Option<NaiveDateTime>> {
    let mut stmt = conn.prepare_cached(
        "SELECT MAX(start_at) FROM stream_game_span WHERE channel_login = ?1",
    )?;
    let value = stmt.query_row(params![login], |row| get_opt_instant(row, 0))?;
    Ok(value)
}

/// Ends every open span whose channel is currently marked offline.
pub(crate) fn close_spans_for_offline(conn: &Connection, now: NaiveDateTime) -> Result<usize> {
    let updated = conn.execute(
        r#"
        UPDATE stream_game_span
           SET end_at = MAX(start_at, ?1)
         WHERE end_at IS NULL
           AND channel_login IN (
             SELECT channel_login FROM stream_current WHERE is_live = 0
           )
        "#,
        params![format_instant(now)],
    )?;
    Ok(updated)
}

impl Db {
    /// Open span per login, used to warm the cycle cache.
    pub fn open_spans(&self) -> Result<HashMap<String, OpenSpan>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT channel_login, game_id, game_name, start_at
            FROM stream_game_span
            WHERE end_at IS NULL
            "#,
        )?;
        let mut rows = stmt.query([])?;
        let mut out = HashMap::new();
        while let Some(row) = rows.next()? {
            out.insert(
                row.get::<_, String>(0)?,
                OpenSpan {
                    game_id: row.get(1)?,
                    game_name: row.get(2)?,
                    start_at: get_instant(row, 3)?,
                },
            );
        }
        Ok(out)
    }

    pub fn spans_for_login(&self, login: &str) -> Result<Vec<GameSpan>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM stream_game_span WHERE channel_login = ?1 ORDER BY start_at ASC, id ASC",
            SPAN_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![login], row_to_span)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn recent_spans(&self, login: &str, limit: usize) -> Result<Vec<GameSpan>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM stream_game_span WHERE channel_login = ?1 ORDER BY start_at DESC, id DESC LIMIT ?2",
            SPAN_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![login, limit as i64], row_to_span)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
