use streamstat_core::StatsRange;

use crate::error::{AppError, Result};

/// Parses a CLI range, defaulting to the last 24 hours.
pub fn parse_range(value: Option<&str>) -> Result<StatsRange> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(StatsRange::default()),
        Some(value) => value.parse::<StatsRange>().map_err(AppError::InvalidInput),
    }
}
