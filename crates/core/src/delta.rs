use chrono::NaiveDateTime;

pub const MIN_DELTA_MINUTES: i64 = 1;
pub const MAX_DELTA_MINUTES: i64 = 30;

/// Minutes attributed to one sample, measured from the later of the last
/// sample and the reported session start. Always within
/// `[MIN_DELTA_MINUTES, MAX_DELTA_MINUTES]`.
pub fn estimate_minutes(
    now: NaiveDateTime,
    last_seen: Option<NaiveDateTime>,
    session_start: Option<NaiveDateTime>,
    default_minutes: i64,
) -> i64 {
    let base = match (last_seen, session_start) {
        (Some(last_seen), Some(started)) => Some(last_seen.max(started)),
        (last_seen, started) => last_seen.or(started),
    };
    let minutes = match base {
        Some(base) => (now - base).num_seconds() as f64 / 60.0,
        None => default_minutes as f64,
    };
    minutes
        .clamp(MIN_DELTA_MINUTES as f64, MAX_DELTA_MINUTES as f64)
        .round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::parse_instant;

    fn now() -> NaiveDateTime {
        parse_instant("2025-05-10 12:00:00").expect("instant")
    }

    #[test]
    fn uses_default_when_nothing_is_known() {
        assert_eq!(estimate_minutes(now(), None, None, 5), 5);
        assert_eq!(estimate_minutes(now(), None, None, 0), 1);
        assert_eq!(estimate_minutes(now(), None, None, 90), 30);
    }

    #[test]
    fn measures_from_last_seen() {
        let last_seen = now() - Duration::minutes(5);
        assert_eq!(estimate_minutes(now(), Some(last_seen), None, 5), 5);
    }

    #[test]
    fn fresh_session_start_wins_over_stale_last_seen() {
        let last_seen = now() - Duration::hours(3);
        let started = now() - Duration::minutes(2);
        assert_eq!(estimate_minutes(now(), Some(last_seen), Some(started), 5), 2);
    }

    #[test]
    fn clamps_long_gaps_and_future_bases() {
        let old = now() - Duration::hours(6);
        assert_eq!(estimate_minutes(now(), Some(old), None, 5), 30);
        let future = now() + Duration::minutes(10);
        assert_eq!(estimate_minutes(now(), Some(future), None, 5), 1);
        let just_now = now() - Duration::seconds(10);
        assert_eq!(estimate_minutes(now(), None, Some(just_now), 5), 1);
    }

    #[test]
    fn rounds_to_nearest_minute() {
        let last_seen = now() - Duration::seconds(5 * 60 + 40);
        assert_eq!(estimate_minutes(now(), Some(last_seen), None, 5), 6);
    }

    #[test]
    fn result_is_always_in_range() {
        let offsets = [-7200, -61, -1, 0, 30, 59, 60, 61, 1799, 1800, 1801, 86_400];
        for last in offsets {
            for start in offsets {
                let last_seen = Some(now() - Duration::seconds(last));
                let started = Some(now() - Duration::seconds(start));
                for (a, b) in [(last_seen, started), (last_seen, None), (None, started)] {
                    let minutes = estimate_minutes(now(), a, b, 5);
                    assert!((MIN_DELTA_MINUTES..=MAX_DELTA_MINUTES).contains(&minutes));
                }
            }
        }
    }
}
