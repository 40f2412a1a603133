mod support;

use streamstat_core::LiveSample;
use support::{at, make_sample, setup_db, upsert};

#[test]
fn upsert_inserts_then_overwrites_sample_fields() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    upsert(db, &make_sample("alpha", 120, "509658"), at("2025-05-10 12:00:00"));

    let mut next = make_sample("alpha", 80, "21779");
    next.language = Some("en".to_string());
    upsert(db, &next, at("2025-05-10 12:05:00"));

    let row = db.get_current("alpha").expect("load").expect("row");
    assert!(row.is_live);
    assert_eq!(row.viewer_count, 80);
    assert_eq!(row.game_id.as_deref(), Some("21779"));
    assert_eq!(row.language.as_deref(), Some("en"));
    assert_eq!(row.captured_at, at("2025-05-10 12:05:00"));
    assert_eq!(row.last_seen_at, at("2025-05-10 12:05:00"));
}

#[test]
fn session_start_is_sticky() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let mut first = make_sample("alpha", 10, "1");
    first.started_at = Some(at("2025-05-10 11:42:00"));
    upsert(db, &first, at("2025-05-10 12:00:00"));

    let second = LiveSample {
        started_at: None,
        ..first.clone()
    };
    upsert(db, &second, at("2025-05-10 12:05:00"));
    let row = db.get_current("alpha").expect("load").expect("row");
    assert_eq!(row.started_at, Some(at("2025-05-10 11:42:00")));

    let restarted = LiveSample {
        started_at: Some(at("2025-05-10 13:00:00")),
        ..first
    };
    upsert(db, &restarted, at("2025-05-10 13:05:00"));
    let row = db.get_current("alpha").expect("load").expect("row");
    assert_eq!(row.started_at, Some(at("2025-05-10 13:00:00")));
}

#[test]
fn channel_id_is_never_overwritten_once_known() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let mut first = make_sample("alpha", 10, "1");
    first.channel_id = None;
    upsert(db, &first, at("2025-05-10 12:00:00"));
    assert_eq!(
        db.get_current("alpha").expect("load").expect("row").channel_id,
        None
    );

    first.channel_id = Some("111".to_string());
    upsert(db, &first, at("2025-05-10 12:05:00"));
    first.channel_id = Some("222".to_string());
    upsert(db, &first, at("2025-05-10 12:10:00"));
    assert_eq!(
        db.get_current("alpha")
            .expect("load")
            .expect("row")
            .channel_id
            .as_deref(),
        Some("111")
    );
}

#[test]
fn upsert_preserves_enrichment_columns() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let sample = make_sample("alpha", 10, "1");
    upsert(db, &sample, at("2025-05-10 12:00:00"));
    let updated = db
        .apply_channel_meta("id-alpha", Some(4_200), Some("https://cdn/avatar.png"))
        .expect("meta");
    assert_eq!(updated, 1);

    upsert(db, &sample, at("2025-05-10 12:05:00"));
    db.apply_channel_meta("id-alpha", None, None).expect("meta");

    let row = db.get_current("alpha").expect("load").expect("row");
    assert_eq!(row.followers_total, Some(4_200));
    assert_eq!(row.avatar_url.as_deref(), Some("https://cdn/avatar.png"));
}

#[test]
fn stale_channels_go_offline_with_zero_viewers() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    upsert(db, &make_sample("stale", 50, "1"), at("2025-05-10 12:00:00"));
    upsert(db, &make_sample("fresh", 70, "1"), at("2025-05-10 12:14:00"));

    let batch = db.begin_batch().expect("batch");
    let marked = batch
        .mark_offline_if_stale(at("2025-05-10 12:16:00"), 15)
        .expect("sweep");
    batch.commit().expect("commit");
    assert_eq!(marked, 1);

    let stale = db.get_current("stale").expect("load").expect("row");
    assert!(!stale.is_live);
    assert_eq!(stale.viewer_count, 0);
    let fresh = db.get_current("fresh").expect("load").expect("row");
    assert!(fresh.is_live);
    assert_eq!(fresh.viewer_count, 70);

    let live: Vec<String> = db
        .list_live()
        .expect("live")
        .into_iter()
        .map(|row| row.login)
        .collect();
    assert_eq!(live, vec!["fresh".to_string()]);
}

#[test]
fn last_seen_cache_warm_reads_every_login() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    upsert(db, &make_sample("alpha", 1, "1"), at("2025-05-10 12:00:00"));
    upsert(db, &make_sample("beta", 1, "1"), at("2025-05-10 12:03:00"));
    let last_seen = db.last_seen_by_login().expect("last seen");
    assert_eq!(last_seen.len(), 2);
    assert_eq!(last_seen.get("beta"), Some(&at("2025-05-10 12:03:00")));
}
