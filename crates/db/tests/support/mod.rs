#![allow(dead_code)]

use std::path::PathBuf;

use chrono::NaiveDateTime;
use streamstat_core::{LiveSample, RollupContribution, parse_instant};
use streamstat_db::{Bucket, Db};
use tempfile::TempDir;

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
    pub path: PathBuf,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let mut db = Db::open(&path).expect("open db");
    db.migrate().expect("migrate db");
    TestDb {
        _dir: dir,
        db,
        path,
    }
}

pub fn at(value: &str) -> NaiveDateTime {
    parse_instant(value).expect("instant")
}

pub fn make_sample(login: &str, viewers: i64, game_id: &str) -> LiveSample {
    LiveSample {
        login: login.to_string(),
        channel_id: Some(format!("id-{login}")),
        viewer_count: viewers,
        game_id: Some(game_id.to_string()),
        game_name: Some(format!("Game {game_id}")),
        language: Some("pl".to_string()),
        started_at: None,
    }
}

pub fn upsert(db: &mut Db, sample: &LiveSample, now: NaiveDateTime) {
    let batch = db.begin_batch().expect("batch");
    batch.upsert_current(sample, now, true).expect("upsert");
    batch.commit().expect("commit");
}

pub fn accumulate(db: &mut Db, sample: &LiveSample, now: NaiveDateTime, minutes: i64) {
    let contribution = RollupContribution::new(sample.viewer_count, minutes);
    let batch = db.begin_batch().expect("batch");
    batch
        .accumulate(Bucket::Hour, sample, now, &contribution)
        .expect("hourly");
    batch
        .accumulate(Bucket::Day, sample, now, &contribution)
        .expect("daily");
    batch.commit().expect("commit");
}
