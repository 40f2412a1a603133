mod support;

use streamstat_db::SpanInsert;
use support::{at, make_sample, setup_db, upsert};

#[test]
fn duplicate_start_reports_conflict() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let sample = make_sample("alpha", 10, "1");
    let batch = db.begin_batch().expect("batch");
    assert_eq!(
        batch
            .insert_span(&sample, at("2025-05-10 12:00:00"))
            .expect("insert"),
        SpanInsert::Inserted
    );
    batch
        .close_open_span("alpha", at("2025-05-10 12:30:00"))
        .expect("close");
    assert_eq!(
        batch
            .insert_span(&sample, at("2025-05-10 12:00:00"))
            .expect("insert again"),
        SpanInsert::Conflict
    );
    batch.commit().expect("commit");
    assert_eq!(db.spans_for_login("alpha").expect("spans").len(), 1);
}

#[test]
fn second_open_span_for_login_is_rejected() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let sample = make_sample("alpha", 10, "1");
    let batch = db.begin_batch().expect("batch");
    batch
        .insert_span(&sample, at("2025-05-10 12:00:00"))
        .expect("insert");
    assert_eq!(
        batch
            .insert_span(&sample, at("2025-05-10 12:05:00"))
            .expect("insert"),
        SpanInsert::Conflict
    );
    batch.commit().expect("commit");
    let open = db.open_spans().expect("open");
    assert_eq!(open.len(), 1);
    assert_eq!(open["alpha"].start_at, at("2025-05-10 12:00:00"));
}

#[test]
fn offline_channels_get_their_spans_closed() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let gone = make_sample("gone", 10, "1");
    let live = make_sample("live", 10, "1");
    upsert(db, &gone, at("2025-05-10 12:00:00"));
    upsert(db, &live, at("2025-05-10 12:20:00"));
    let batch = db.begin_batch().expect("batch");
    batch
        .insert_span(&gone, at("2025-05-10 11:00:00"))
        .expect("insert");
    batch
        .insert_span(&live, at("2025-05-10 11:30:00"))
        .expect("insert");
    let now = at("2025-05-10 12:20:00");
    assert_eq!(batch.mark_offline_if_stale(now, 15).expect("offline"), 1);
    assert_eq!(batch.close_spans_for_offline(now).expect("close"), 1);
    batch.commit().expect("commit");

    let gone_spans = db.spans_for_login("gone").expect("spans");
    assert_eq!(gone_spans[0].end_at, Some(now));
    let live_spans = db.spans_for_login("live").expect("spans");
    assert!(live_spans[0].is_open());
    assert!(db.open_spans().expect("open").contains_key("live"));
    assert!(!db.open_spans().expect("open").contains_key("gone"));
}

#[test]
fn latest_span_end_ignores_open_spans() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let sample = make_sample("alpha", 10, "1");
    let batch = db.begin_batch().expect("batch");
    assert_eq!(batch.latest_span_end("alpha").expect("end"), None);
    batch
        .insert_span(&sample, at("2025-05-10 10:00:00"))
        .expect("insert");
    batch
        .close_open_span("alpha", at("2025-05-10 11:00:00"))
        .expect("close");
    batch
        .insert_span(&sample, at("2025-05-10 11:00:00"))
        .expect("insert");
    assert_eq!(
        batch.latest_span_end("alpha").expect("end"),
        Some(at("2025-05-10 11:00:00"))
    );
    batch.commit().expect("commit");

    let recent = db.recent_spans("alpha", 1).expect("recent");
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].start_at, at("2025-05-10 11:00:00"));
}

#[test]
fn latest_span_start_covers_open_and_closed_spans() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let sample = make_sample("alpha", 10, "1");
    let batch = db.begin_batch().expect("batch");
    assert_eq!(batch.latest_span_start("alpha").expect("start"), None);
    batch
        .insert_span(&sample, at("2025-05-10 10:00:00"))
        .expect("insert");
    batch
        .close_open_span("alpha", at("2025-05-10 10:00:00"))
        .expect("close");
    batch
        .insert_span(&sample, at("2025-05-10 10:00:01"))
        .expect("insert");
    assert_eq!(
        batch.latest_span_start("alpha").expect("start"),
        Some(at("2025-05-10 10:00:01"))
    );
    assert_eq!(batch.latest_span_start("beta").expect("start"), None);
    batch.commit().expect("commit");
}
