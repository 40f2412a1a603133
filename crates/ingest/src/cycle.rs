use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::{Duration, NaiveDateTime};
use streamstat_core::{
    LiveSample, LocalZone, OpenSpan, PruneStats, RollupContribution, SpanState,
    SpanTransition, estimate_minutes,
};
use streamstat_db::{Bucket, Db, SpanInsert, WriteBatch};

use crate::clock::Clock;
use crate::source::{LiveSource, StreamRecord};
use crate::types::{CycleOutcome, CycleStage, CycleStats, EngineSettings, Result};

/// Caches a cycle reads from instead of querying per sample. Rebuilt from the store
/// at the start of every cycle.
#[derive(Debug, Default)]
pub struct CycleState {
    pub last_seen: HashMap<String, NaiveDateTime>,
    pub open_spans: HashMap<String, OpenSpan>,
    pub seen_this_cycle: HashSet<String>,
}

impl CycleState {
    pub fn warm(db: &Db) -> Result<Self> {
        Ok(Self {
            last_seen: db.last_seen_by_login()?,
            open_spans: db.open_spans()?,
            seen_this_cycle: HashSet::new(),
        })
    }
}

pub struct Engine {
    zone: LocalZone,
    clock: Box<dyn Clock>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(zone: LocalZone, clock: Box<dyn Clock>, settings: EngineSettings) -> Self {
        Self {
            zone,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Current local wall-clock time.
    pub fn now(&self) -> NaiveDateTime {
        self.zone.normalize(self.clock.now_utc())
    }

    /// Fetches every page, applies each in its own transaction, then reconciles.
    /// Pages committed before a failure stay committed.
    pub fn run_cycle(
        &self,
        db: &mut Db,
        source: &dyn LiveSource,
        token: &str,
        run_retention: bool,
    ) -> CycleOutcome {
        let mut stats = CycleStats::default();
        let started = Instant::now();

        let mut state = match CycleState::warm(db) {
            Ok(state) => state,
            Err(error) => {
                return CycleOutcome::Failed {
                    stage: CycleStage::Warm,
                    error,
                    stats,
                };
            }
        };
        tracing::info!(
            last_seen = state.last_seen.len(),
            open_spans = state.open_spans.len(),
            warm_ms = started.elapsed().as_millis() as u64,
            "cycle caches loaded"
        );

        let mut cursor: Option<String> = None;
        let mut page = 0usize;
        loop {
            page += 1;
            let api_started = Instant::now();
            let fetched = match source.fetch_page(token, cursor.as_deref()) {
                Ok(fetched) => fetched,
                Err(error) => {
                    return CycleOutcome::Failed {
                        stage: CycleStage::Fetch { page },
                        error,
                        stats,
                    };
                }
            };
            let api_ms = api_started.elapsed().as_millis() as u64;
            if fetched.streams.is_empty() {
                tracing::info!(page, "empty page; end of listing");
                break;
            }

            let db_started = Instant::now();
            if let Err(error) = self.apply_page(db, &mut state, &fetched.streams, &mut stats) {
                return CycleOutcome::Failed {
                    stage: CycleStage::Apply { page },
                    error,
                    stats,
                };
            }
            stats.pages += 1;
            tracing::info!(
                page,
                channels = fetched.streams.len(),
                api_ms,
                db_ms = db_started.elapsed().as_millis() as u64,
                samples = stats.samples,
                "page committed"
            );

            match fetched.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        if let Err(error) = self.reconcile(db, &mut stats) {
            return CycleOutcome::Failed {
                stage: CycleStage::Reconcile,
                error,
                stats,
            };
        }

        if run_retention {
            match self.prune(db) {
                Ok(pruned) => stats.retention = Some(pruned),
                Err(err) => tracing::warn!(error = %err, "retention sweep failed"),
            }
        }

        tracing::info!(
            pages = stats.pages,
            samples = stats.samples,
            duplicates = stats.duplicates,
            offline = stats.offline_marked,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cycle completed"
        );
        CycleOutcome::Completed(stats)
    }

    fn apply_page(
        &self,
        db: &mut Db,
        state: &mut CycleState,
        records: &[StreamRecord],
        stats: &mut CycleStats,
    ) -> Result<()> {
        let now = self.now();
        let batch = db.begin_batch()?;
        let mut counts = PageCounts::default();
        // Per-login cache updates, applied only once the page is durable.
        let mut staged: HashMap<String, Option<OpenSpan>> = HashMap::new();

        for record in records {
            let Some(sample) = record.to_sample(&self.zone) else {
                tracing::warn!(user_id = ?record.user_id, "skipping stream without login");
                counts.skipped += 1;
                continue;
            };
            let repeated = staged.contains_key(&sample.login)
                || state.seen_this_cycle.contains(&sample.login);
            if repeated {
                counts.duplicates += 1;
                tracing::warn!(login = %sample.login, "login listed twice in one cycle");
                if self.settings.dedupe_logins_per_cycle {
                    continue;
                }
            }

            let (last_seen, open) = match staged.get(&sample.login) {
                Some(open) => (Some(now), open.clone()),
                None => (
                    state.last_seen.get(&sample.login).copied(),
                    state.open_spans.get(&sample.login).cloned(),
                ),
            };
            let open = self.apply_sample(&batch, &sample, now, last_seen, open, &mut counts)?;
            staged.insert(sample.login, open);
        }

        batch.commit()?;

        for (login, open) in staged {
            state.last_seen.insert(login.clone(), now);
            match open {
                Some(open) => {
                    state.open_spans.insert(login.clone(), open);
                }
                None => {
                    state.open_spans.remove(&login);
                }
            }
            state.seen_this_cycle.insert(login);
        }
        counts.add_to(stats);
        Ok(())
    }

    fn apply_sample(
        &self,
        batch: &WriteBatch<'_>,
        sample: &LiveSample,
        now: NaiveDateTime,
        last_seen: Option<NaiveDateTime>,
        open: Option<OpenSpan>,
        counts: &mut PageCounts,
    ) -> Result<Option<OpenSpan>> {
        let minutes = estimate_minutes(
            now,
            last_seen,
            sample.started_at,
            self.settings.interval_minutes,
        );
        let contribution = RollupContribution::new(sample.viewer_count, minutes);

        batch.upsert_current(sample, now, true)?;
        batch.accumulate(Bucket::Hour, sample, now, &contribution)?;
        batch.accumulate(Bucket::Day, sample, now, &contribution)?;
        counts.samples += 1;

        let state = SpanState::from_open(open.as_ref());
        match state.touch(sample.game_id.as_deref(), sample.started_at, now) {
            SpanTransition::Unchanged => Ok(open),
            SpanTransition::Open { start_at } => {
                // A new span never starts inside one the sweep already closed.
                let floor = batch.latest_span_end(&sample.login)?;
                let start_at = floor.map_or(start_at, |floor| start_at.max(floor));
                open_span(batch, sample, start_at, now, counts)
            }
            SpanTransition::Switch { close_at, start_at } => {
                counts.spans_closed += batch.close_open_span(&sample.login, close_at)?;
                tracing::debug!(
                    login = %sample.login,
                    from = ?open.as_ref().and_then(|span| span.game_name.as_deref()),
                    to = ?sample.game_name,
                    "category changed"
                );
                open_span(batch, sample, start_at, now, counts)
            }
        }
    }

    /// Stale sweep, span close for offline channels and follower sync, in one transaction.
    pub fn reconcile(&self, db: &mut Db, stats: &mut CycleStats) -> Result<()> {
        let now = self.now();
        let batch = db.begin_batch()?;
        let offline = batch.mark_offline_if_stale(now, self.settings.stale_minutes)?;
        let closed = batch.close_spans_for_offline(now)?;
        let followers = batch.sync_followers(
            now,
            self.settings.follower_sync_hours,
            self.settings.follower_sync_days,
        )?;
        batch.commit()?;
        stats.offline_marked = offline;
        stats.offline_spans_closed = closed;
        stats.followers_synced = followers;
        tracing::info!(offline, spans_closed = closed, followers, "reconciled offline channels");
        Ok(())
    }

    /// Deletes rollup rows past their retention horizon.
    pub fn prune(&self, db: &mut Db) -> Result<PruneStats> {
        let cutoff = self.settings.retention_cutoff(self.now());
        let batch = db.begin_batch()?;
        let pruned = batch.prune_rollups(&cutoff)?;
        batch.commit()?;
        tracing::info!(
            hourly_deleted = pruned.hourly_deleted,
            daily_deleted = pruned.daily_deleted,
            "retention sweep done"
        );
        Ok(pruned)
    }
}

/// Inserts a span at `start_at`. On a key collision retries once, one second after
/// the latest of `start_at`, `now` and the login's newest span start. A second
/// collision leaves the channel without an open span for this sample.
fn open_span(
    batch: &WriteBatch<'_>,
    sample: &LiveSample,
    start_at: NaiveDateTime,
    now: NaiveDateTime,
    counts: &mut PageCounts,
) -> Result<Option<OpenSpan>> {
    let opened = |start_at| OpenSpan {
        game_id: sample.game_id.clone(),
        game_name: sample.game_name.clone(),
        start_at,
    };
    if batch.insert_span(sample, start_at)? == SpanInsert::Inserted {
        counts.spans_opened += 1;
        return Ok(Some(opened(start_at)));
    }
    let latest = batch.latest_span_start(&sample.login)?;
    let retry_at = latest.map_or(start_at.max(now), |latest| start_at.max(now).max(latest))
        + Duration::seconds(1);
    tracing::debug!(login = %sample.login, %start_at, %retry_at, "span start collided; retrying");
    match batch.insert_span(sample, retry_at)? {
        SpanInsert::Inserted => {
            counts.spans_opened += 1;
            Ok(Some(opened(retry_at)))
        }
        SpanInsert::Conflict => {
            counts.span_conflicts += 1;
            tracing::warn!(login = %sample.login, %retry_at, "span insert collided twice; span skipped");
            Ok(None)
        }
    }
}

/// Counters staged for a page and folded into the cycle only after commit.
#[derive(Debug, Default)]
struct PageCounts {
    samples: usize,
    duplicates: usize,
    skipped: usize,
    spans_opened: usize,
    spans_closed: usize,
    span_conflicts: usize,
}

impl PageCounts {
    fn add_to(self, stats: &mut CycleStats) {
        stats.samples += self.samples;
        stats.duplicates += self.duplicates;
        stats.skipped += self.skipped;
        stats.spans_opened += self.spans_opened;
        stats.spans_closed += self.spans_closed;
        stats.span_conflicts += self.span_conflicts;
    }
}
