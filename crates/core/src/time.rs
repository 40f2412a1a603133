use chrono::{
    DateTime, NaiveDate, NaiveDateTime, ParseResult, SubsecRound, Timelike, Utc,
};
use chrono_tz::Tz;

/// Storage format for instants; sorts lexicographically.
pub const INSTANT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time zone every stored instant is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalZone {
    tz: Tz,
}

impl LocalZone {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        name.trim().parse::<Tz>().ok().map(Self::new)
    }

    pub fn name(&self) -> &'static str {
        self.tz.name()
    }

    /// Local wall-clock time, second-truncated, zone dropped.
    pub fn normalize(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.tz).naive_local().trunc_subsecs(0)
    }

    /// Parses an ISO-8601 instant from the live API. Empty or malformed values yield `None`.
    pub fn parse_source_instant(&self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|parsed| self.normalize(parsed.with_timezone(&Utc)))
    }
}

impl Default for LocalZone {
    fn default() -> Self {
        Self::new(chrono_tz::Europe::Warsaw)
    }
}

pub fn floor_to_hour(value: NaiveDateTime) -> NaiveDateTime {
    value
        .with_minute(0)
        .and_then(|value| value.with_second(0))
        .and_then(|value| value.with_nanosecond(0))
        .unwrap_or(value)
}

pub fn bucket_date(value: NaiveDateTime) -> NaiveDate {
    value.date()
}

pub fn format_instant(value: NaiveDateTime) -> String {
    value.format(INSTANT_FORMAT).to_string()
}

pub fn parse_instant(value: &str) -> ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, INSTANT_FORMAT)
}

pub fn format_date(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> ParseResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
}
