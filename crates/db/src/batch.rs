use chrono::NaiveDateTime;
use rusqlite::Transaction;
use streamstat_core::{LiveSample, PruneStats, RetentionCutoff, RollupContribution};

use crate::error::Result;
use crate::types::{Bucket, SpanInsert};
use crate::{current, rollups, spans};

/// Engine writes applied inside one transaction.
pub struct WriteBatch<'a> {
    tx: Transaction<'a>,
}

impl<'a> WriteBatch<'a> {
    pub(crate) fn new(tx: Transaction<'a>) -> Self {
        Self { tx }
    }

    pub fn upsert_current(
        &self,
        sample: &LiveSample,
        captured_at: NaiveDateTime,
        is_live: bool,
    ) -> Result<()> {
        current::upsert_current(&self.tx, sample, captured_at, is_live)
    }

    pub fn accumulate(
        &self,
        bucket: Bucket,
        sample: &LiveSample,
        now: NaiveDateTime,
        contribution: &RollupContribution,
    ) -> Result<()> {
        rollups::accumulate(&self.tx, bucket, sample, now, contribution)
    }

    pub fn insert_span(&self, sample: &LiveSample, start_at: NaiveDateTime) -> Result<SpanInsert> {
        spans::insert_span(&self.tx, sample, start_at)
    }

    pub fn close_open_span(&self, login: &str, at: NaiveDateTime) -> Result<usize> {
        spans::close_open_span(&self.tx, login, at)
    }

    pub fn latest_span_end(&self, login: &str) -> Result<Option<NaiveDateTime>> {
        spans::latest_span_end(&self.tx, login)
    }

    pub fn latest_span_start(&self, login: &str) -> Result<Option<NaiveDateTime>> {
        spans::latest_span_start(&self.tx, login)
    }

    pub fn mark_offline_if_stale(&self, now: NaiveDateTime, stale_minutes: i64) -> Result<usize> {
        current::mark_offline_if_stale(&self.tx, now, stale_minutes)
    }

    pub fn close_spans_for_offline(&self, now: NaiveDateTime) -> Result<usize> {
        spans::close_spans_for_offline(&self.tx, now)
    }

    pub fn sync_followers(
        &self,
        now: NaiveDateTime,
        hourly_hours: i64,
        daily_days: i64,
    ) -> Result<usize> {
        rollups::sync_followers(&self.tx, now, hourly_hours, daily_days)
    }

    pub fn prune_rollups(&self, cutoff: &RetentionCutoff) -> Result<PruneStats> {
        rollups::prune_rollups(&self.tx, cutoff)
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}
