#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use ingest::{
    Clock, CredentialSource, Engine, EngineSettings, IngestError, LiveSource, Result, StreamPage,
    StreamRecord,
};
use streamstat_core::{LocalZone, parse_instant};
use streamstat_db::Db;
use tempfile::TempDir;

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut db = Db::open(dir.path().join("ingest.sqlite")).expect("open db");
    db.migrate().expect("migrate db");
    TestDb { _dir: dir, db }
}

pub fn at(value: &str) -> NaiveDateTime {
    parse_instant(value).expect("instant")
}

#[derive(Clone)]
pub struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

impl ManualClock {
    pub fn starting_at(value: &str) -> Self {
        Self(Arc::new(Mutex::new(at(value).and_utc())))
    }

    pub fn set(&self, value: &str) {
        *self.0.lock().expect("clock lock") = at(value).and_utc();
    }

    pub fn advance_minutes(&self, minutes: i64) {
        *self.0.lock().expect("clock lock") += Duration::minutes(minutes);
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.0.lock().expect("clock lock")
    }
}

/// Engine in UTC so stored instants equal the clock's.
pub fn engine(clock: &ManualClock, settings: EngineSettings) -> Engine {
    engine_in(chrono_tz::UTC, clock, settings)
}

pub fn engine_in(tz: chrono_tz::Tz, clock: &ManualClock, settings: EngineSettings) -> Engine {
    Engine::new(LocalZone::new(tz), Box::new(clock.clone()), settings)
}

pub fn stream(login: &str, viewers: i64, game_id: &str) -> StreamRecord {
    StreamRecord {
        user_login: login.to_string(),
        user_id: Some(format!("id-{login}")),
        viewer_count: viewers,
        game_id: Some(game_id.to_string()),
        game_name: Some(format!("Game {game_id}")),
        language: Some("pl".to_string()),
        started_at: None,
    }
}

pub enum Scripted {
    Page(StreamPage),
    Fail,
}

pub fn page(streams: Vec<StreamRecord>, cursor: Option<&str>) -> Scripted {
    Scripted::Page(StreamPage {
        streams,
        cursor: cursor.map(str::to_string),
    })
}

/// Serves scripted pages in order; an exhausted script serves empty pages.
#[derive(Clone, Default)]
pub struct FakeSource {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    tokens: Arc<Mutex<Vec<String>>>,
}

impl FakeSource {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            tokens: Arc::default(),
        }
    }

    pub fn push(&self, item: Scripted) {
        self.script.lock().expect("script lock").push_back(item);
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().expect("script lock").len()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().expect("tokens lock").clone()
    }
}

impl LiveSource for FakeSource {
    fn fetch_page(&self, token: &str, _cursor: Option<&str>) -> Result<StreamPage> {
        self.tokens
            .lock()
            .expect("tokens lock")
            .push(token.to_string());
        match self.script.lock().expect("script lock").pop_front() {
            Some(Scripted::Page(page)) => Ok(page),
            Some(Scripted::Fail) => Err(IngestError::Status {
                status: 503,
                url: "fake://streams".to_string(),
            }),
            None => Ok(StreamPage::default()),
        }
    }
}

/// Hands out scripted tokens; `None` entries fail. An exhausted script fails.
#[derive(Clone, Default)]
pub struct FakeCredentials {
    script: Arc<Mutex<VecDeque<Option<String>>>>,
    calls: Arc<Mutex<usize>>,
}

impl FakeCredentials {
    pub fn new(script: Vec<Option<&str>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(
                script
                    .into_iter()
                    .map(|token| token.map(str::to_string))
                    .collect(),
            )),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("calls lock")
    }
}

impl CredentialSource for FakeCredentials {
    fn acquire(&self) -> Result<String> {
        *self.calls.lock().expect("calls lock") += 1;
        match self.script.lock().expect("script lock").pop_front() {
            Some(Some(token)) => Ok(token),
            _ => Err(IngestError::Credentials("denied".to_string())),
        }
    }
}
