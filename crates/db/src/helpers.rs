use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::Row;
use rusqlite::types::Type;
use streamstat_core::{ChannelSnapshot, GameSpan, RollupRow, parse_date, parse_instant};

use crate::types::Bucket;

fn conversion_error(idx: usize, err: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn get_instant(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let value: String = row.get(idx)?;
    parse_instant(&value).map_err(|err| conversion_error(idx, err))
}

pub(crate) fn get_opt_instant(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|value| parse_instant(&value).map_err(|err| conversion_error(idx, err)))
        .transpose()
}

fn get_bucket_start(row: &Row<'_>, idx: usize, bucket: Bucket) -> rusqlite::Result<NaiveDateTime> {
    match bucket {
        Bucket::Hour => get_instant(row, idx),
        Bucket::Day => {
            let value: String = row.get(idx)?;
            parse_date(&value)
                .map(|date| date.and_time(NaiveTime::MIN))
                .map_err(|err| conversion_error(idx, err))
        }
    }
}

pub(crate) const SNAPSHOT_COLUMNS: &str = "channel_login, channel_id, captured_at, is_live, \
     viewer_count, game_id, game_name, language, last_seen_at, started_at, followers_total, avatar_url";

pub(crate) fn row_to_snapshot(row: &Row<'_>) -> rusqlite::Result<ChannelSnapshot> {
    Ok(ChannelSnapshot {
        login: row.get(0)?,
        channel_id: row.get(1)?,
        captured_at: get_instant(row, 2)?,
        is_live: row.get::<_, i64>(3)? != 0,
        viewer_count: row.get(4)?,
        game_id: row.get(5)?,
        game_name: row.get(6)?,
        language: row.get(7)?,
        last_seen_at: get_instant(row, 8)?,
        started_at: get_opt_instant(row, 9)?,
        followers_total: row.get(10)?,
        avatar_url: row.get(11)?,
    })
}

pub(crate) const ROLLUP_COLUMNS: &str = "channel_login, channel_id, bucket_start, sum_viewers, \
     sample_count, max_viewers, minutes_streamed, watched_minutes, followers_latest, last_seen_at";

pub(crate) fn row_to_rollup(row: &Row<'_>, bucket: Bucket) -> rusqlite::Result<RollupRow> {
    Ok(RollupRow {
        login: row.get(0)?,
        channel_id: row.get(1)?,
        bucket_start: get_bucket_start(row, 2, bucket)?,
        sum_viewers: row.get(3)?,
        sample_count: row.get(4)?,
        max_viewers: row.get(5)?,
        minutes_streamed: row.get(6)?,
        watched_minutes: row.get(7)?,
        followers_latest: row.get(8)?,
        last_seen_at: get_instant(row, 9)?,
    })
}

pub(crate) const SPAN_COLUMNS: &str =
    "id, channel_login, channel_id, game_id, game_name, start_at, end_at";

pub(crate) fn row_to_span(row: &Row<'_>) -> rusqlite::Result<GameSpan> {
    Ok(GameSpan {
        id: row.get(0)?,
        login: row.get(1)?,
        channel_id: row.get(2)?,
        game_id: row.get(3)?,
        game_name: row.get(4)?,
        start_at: get_instant(row, 5)?,
        end_at: get_opt_instant(row, 6)?,
    })
}
