use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ingest::{DEFAULT_API_BASE, DEFAULT_AUTH_URL, EngineSettings, HelixConfig, MAX_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use streamstat_core::LocalZone;

use crate::error::{AppError, Result};

pub const DEFAULT_TIMEZONE: &str = "Europe/Warsaw";
const ENV_PREFIX: &str = "STREAMSTAT_";
const MAX_MINUTES: i64 = 24 * 60;
const MAX_DAYS: i64 = 36_500;
const MAX_BACKOFF_MS: u64 = 60_000;

/// Contents of `streamstat.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    pub helix: HelixSection,
    pub engine: EngineSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            database_path: None,
            helix: HelixSection::default(),
            engine: EngineSection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelixSection {
    pub client_id: String,
    pub client_secret: String,
    pub api_base: String,
    pub auth_url: String,
    pub page_size: u32,
    pub timeout_secs: u64,
    pub retry_max: u32,
    pub retry_backoff_ms: u64,
}

impl Default for HelixSection {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            timeout_secs: 20,
            retry_max: 3,
            retry_backoff_ms: 1_500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub interval_minutes: i64,
    pub stale_minutes: i64,
    pub keep_hourly_days: i64,
    pub keep_daily_days: i64,
    pub retention_every: u64,
    pub follower_sync_hours: i64,
    pub follower_sync_days: i64,
    pub dedupe_logins_per_cycle: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        let defaults = EngineSettings::default();
        Self {
            interval_minutes: defaults.interval_minutes,
            stale_minutes: defaults.stale_minutes,
            keep_hourly_days: defaults.keep_hourly_days,
            keep_daily_days: defaults.keep_daily_days,
            retention_every: defaults.retention_every,
            follower_sync_hours: defaults.follower_sync_hours,
            follower_sync_days: defaults.follower_sync_days,
            dedupe_logins_per_cycle: defaults.dedupe_logins_per_cycle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: AppConfig,
    pub path: PathBuf,
    pub created: bool,
}

/// Reads the config file, writing one with defaults when it does not exist yet.
pub fn load_or_create(path: &Path) -> Result<ConfigLoad> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        return Ok(ConfigLoad {
            config,
            path: path.to_path_buf(),
            created: false,
        });
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let config = AppConfig::default();
    fs::write(path, toml::to_string_pretty(&config)?)?;
    tracing::info!(path = %path.display(), "wrote default config");
    Ok(ConfigLoad {
        config,
        path: path.to_path_buf(),
        created: true,
    })
}

/// Loads `.env` from the working directory, if present.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| AppError::Config(format!("{}{} has invalid value {:?}", ENV_PREFIX, key, value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!(
            "{}{} has invalid value {:?}",
            ENV_PREFIX, key, value
        ))),
    }
}

impl AppConfig {
    /// Applies `STREAMSTAT_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which receives full variable names.
    /// Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = get("TIMEZONE") {
            self.timezone = value;
        }
        if let Some(value) = get("DB_PATH") {
            self.database_path = Some(PathBuf::from(value));
        }
        if let Some(value) = get("CLIENT_ID") {
            self.helix.client_id = value;
        }
        if let Some(value) = get("CLIENT_SECRET") {
            self.helix.client_secret = value;
        }
        if let Some(value) = get("API_BASE") {
            self.helix.api_base = value;
        }
        if let Some(value) = get("AUTH_URL") {
            self.helix.auth_url = value;
        }
        if let Some(value) = get("PAGE_SIZE") {
            self.helix.page_size = parse_env("PAGE_SIZE", &value)?;
        }
        if let Some(value) = get("TIMEOUT_SECS") {
            self.helix.timeout_secs = parse_env("TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = get("RETRY_MAX") {
            self.helix.retry_max = parse_env("RETRY_MAX", &value)?;
        }
        if let Some(value) = get("RETRY_BACKOFF_MS") {
            self.helix.retry_backoff_ms = parse_env("RETRY_BACKOFF_MS", &value)?;
        }
        if let Some(value) = get("INTERVAL_MINUTES") {
            self.engine.interval_minutes = parse_env("INTERVAL_MINUTES", &value)?;
        }
        if let Some(value) = get("STALE_MINUTES") {
            self.engine.stale_minutes = parse_env("STALE_MINUTES", &value)?;
        }
        if let Some(value) = get("KEEP_HOURLY_DAYS") {
            self.engine.keep_hourly_days = parse_env("KEEP_HOURLY_DAYS", &value)?;
        }
        if let Some(value) = get("KEEP_DAILY_DAYS") {
            self.engine.keep_daily_days = parse_env("KEEP_DAILY_DAYS", &value)?;
        }
        if let Some(value) = get("RETENTION_EVERY") {
            self.engine.retention_every = parse_env("RETENTION_EVERY", &value)?;
        }
        if let Some(value) = get("FOLLOWER_SYNC_HOURS") {
            self.engine.follower_sync_hours = parse_env("FOLLOWER_SYNC_HOURS", &value)?;
        }
        if let Some(value) = get("FOLLOWER_SYNC_DAYS") {
            self.engine.follower_sync_days = parse_env("FOLLOWER_SYNC_DAYS", &value)?;
        }
        if let Some(value) = get("DEDUPE_LOGINS") {
            self.engine.dedupe_logins_per_cycle = parse_flag("DEDUPE_LOGINS", &value)?;
        }
        Ok(())
    }

    pub fn zone(&self) -> Result<LocalZone> {
        LocalZone::from_name(&self.timezone)
            .ok_or_else(|| AppError::Config(format!("unknown timezone {:?}", self.timezone)))
    }

    pub fn validate(&self) -> Result<()> {
        self.zone()?;
        if self.helix.page_size == 0 || self.helix.page_size > MAX_PAGE_SIZE {
            return Err(AppError::Config(format!(
                "helix.page_size must be within 1..={}",
                MAX_PAGE_SIZE
            )));
        }
        let bounded = [
            ("engine.interval_minutes", self.engine.interval_minutes, MAX_MINUTES),
            ("engine.stale_minutes", self.engine.stale_minutes, MAX_MINUTES),
            ("engine.keep_hourly_days", self.engine.keep_hourly_days, MAX_DAYS),
            ("engine.keep_daily_days", self.engine.keep_daily_days, MAX_DAYS),
            ("engine.follower_sync_hours", self.engine.follower_sync_hours, MAX_DAYS * 24),
            ("engine.follower_sync_days", self.engine.follower_sync_days, MAX_DAYS),
        ];
        for (name, value, max) in bounded {
            if value <= 0 || value > max {
                return Err(AppError::Config(format!("{} must be within 1..={}", name, max)));
            }
        }
        if self.helix.retry_backoff_ms > MAX_BACKOFF_MS {
            return Err(AppError::Config(format!(
                "helix.retry_backoff_ms must be at most {}",
                MAX_BACKOFF_MS
            )));
        }
        Ok(())
    }

    pub fn helix_config(&self) -> HelixConfig {
        HelixConfig {
            client_id: self.helix.client_id.clone(),
            client_secret: self.helix.client_secret.clone(),
            api_base: self.helix.api_base.clone(),
            auth_url: self.helix.auth_url.clone(),
            page_size: self.helix.page_size,
            timeout: Duration::from_secs(self.helix.timeout_secs),
            retry_max: self.helix.retry_max,
            retry_backoff: Duration::from_millis(self.helix.retry_backoff_ms),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            interval_minutes: self.engine.interval_minutes,
            stale_minutes: self.engine.stale_minutes,
            keep_hourly_days: self.engine.keep_hourly_days,
            keep_daily_days: self.engine.keep_daily_days,
            retention_every: self.engine.retention_every,
            follower_sync_hours: self.engine.follower_sync_hours,
            follower_sync_days: self.engine.follower_sync_days,
            dedupe_logins_per_cycle: self.engine.dedupe_logins_per_cycle,
        }
    }
}
