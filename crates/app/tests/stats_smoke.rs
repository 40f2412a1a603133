use streamstat_app::{AppConfig, AppError, AppPaths, AppState};
use streamstat_core::{LiveSample, RollupContribution, StatsRange, parse_instant};
use streamstat_db::Bucket;
use tempfile::tempdir;

fn sample(login: &str, viewers: i64, game_id: &str) -> LiveSample {
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

fn app_state(dir: &std::path::Path) -> AppState {
    let config = AppConfig {
        timezone: "UTC".to_string(),
        ..AppConfig::default()
    };
    let app_state = AppState::new(AppPaths::new(dir.to_path_buf()), config).expect("app state");
    app_state.setup_db().expect("setup db");
    app_state
}

#[test]
fn channel_report_combines_rollups_and_spans() {
    let dir = tempdir().expect("temp dir");
    let app_state = app_state(dir.path());
    let now = parse_instant("2025-05-10 12:30:00").expect("instant");
    {
        let mut db = app_state.open_db().expect("open db");
        let batch = db.begin_batch().expect("batch");
        let alpha = sample("alpha", 120, "509658");
        batch.upsert_current(&alpha, now, true).expect("current");
        for bucket in [Bucket::Hour, Bucket::Day] {
            batch
                .accumulate(bucket, &alpha, now, &RollupContribution::new(120, 5))
                .expect("rollup");
        }
        batch
            .insert_span(&alpha, parse_instant("2025-05-10 12:00:00").expect("instant"))
            .expect("span");
        let beta = sample("beta", 10, "21779");
        for bucket in [Bucket::Hour, Bucket::Day] {
            batch
                .accumulate(bucket, &beta, now, &RollupContribution::new(10, 5))
                .expect("rollup");
        }
        batch.commit().expect("commit");
    }

    let stats = &app_state.services.stats;
    let report = stats
        .channel_report(" Alpha ", StatsRange::Last24Hours, now)
        .expect("report");
    assert_eq!(report.stats.login, "alpha");
    assert_eq!(report.stats.max_viewers, 120);
    assert_eq!(report.stats.hours_watched, 10.0);
    assert_eq!(report.games.len(), 1);
    assert_eq!(report.games[0].minutes, 30);

    let json = serde_json::to_value(&report).expect("json");
    assert_eq!(json["range"], "24h");
    assert_eq!(json["login"], "alpha");

    let top = stats
        .top_channels(StatsRange::Last7Days, now, 10)
        .expect("top");
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].login, "alpha");

    let spans = stats.recent_spans("alpha", 5).expect("spans");
    assert_eq!(spans.len(), 1);
    assert!(spans[0].is_open());
}

#[test]
fn unknown_channel_is_not_found() {
    let dir = tempdir().expect("temp dir");
    let app_state = app_state(dir.path());
    let now = app_state.now();

    let err = app_state
        .services
        .stats
        .channel_report("nobody", StatsRange::AllTime, now)
        .expect_err("missing");
    assert!(matches!(err, AppError::NotFound(_)));

    let err = app_state
        .services
        .stats
        .recent_spans("  ", 5)
        .expect_err("blank");
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[test]
fn manual_prune_uses_configured_retention() {
    let dir = tempdir().expect("temp dir");
    let app_state = app_state(dir.path());
    let old = parse_instant("2025-01-01 10:00:00").expect("instant");
    {
        let mut db = app_state.open_db().expect("open db");
        let batch = db.begin_batch().expect("batch");
        for bucket in [Bucket::Hour, Bucket::Day] {
            batch
                .accumulate(bucket, &sample("alpha", 5, "1"), old, &RollupContribution::new(5, 5))
                .expect("rollup");
        }
        batch.commit().expect("commit");
    }

    let now = parse_instant("2025-05-10 12:00:00").expect("instant");
    let pruned = app_state.services.maintenance.prune(now).expect("prune");
    assert_eq!(pruned.hourly_deleted, 1);
    assert_eq!(pruned.daily_deleted, 0);
}

#[test]
fn invalid_timezone_fails_app_setup() {
    let dir = tempdir().expect("temp dir");
    let config = AppConfig {
        timezone: "Atlantis/Capital".to_string(),
        ..AppConfig::default()
    };
    let err = AppState::new(AppPaths::new(dir.path().to_path_buf()), config)
        .err()
        .expect("invalid zone");
    assert!(matches!(err, AppError::Config(_)));
}
