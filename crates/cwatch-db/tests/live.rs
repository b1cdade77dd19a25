//! Live integration tests for cwatch-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root.

use chrono::{Duration, Utc};
use cwatch_core::{parse_entities, NewSignal, SignalCategory, SourceKind};
use cwatch_db::{
    append_snapshot, complete_collection_run, create_collection_run, fail_collection_run,
    get_collection_run, get_entity_by_slug, get_latest_snapshot, insert_signal,
    list_active_entities, list_collection_run_units, list_collection_runs, list_entity_signals,
    list_signals_since, seed_entities, set_entity_active, signal_exists_by_content_hash,
    signal_exists_by_title, signal_exists_by_url, start_collection_run,
    upsert_collection_run_unit, DbError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const ENTITIES_YAML: &str = r"
entities:
  - name: Desk Harbor
    website: https://deskharbor.example
    careers_url: https://boards.example/deskharbor
  - name: Nook Works
    website: https://nook.example
";

async fn seed(pool: &sqlx::PgPool) -> i64 {
    let file = parse_entities(ENTITIES_YAML).unwrap();
    seed_entities(pool, &file.entities).await.unwrap();
    get_entity_by_slug(pool, "desk-harbor")
        .await
        .unwrap()
        .expect("seeded entity should exist")
        .id
}

fn new_signal(entity_id: i64, title: &str) -> NewSignal {
    NewSignal {
        entity_id,
        category: SignalCategory::Hiring,
        title: title.to_string(),
        summary: "summary".to_string(),
        raw_payload: serde_json::json!({}),
        source_url: Some(format!("https://jobs.example/{title}")),
        content_hash: Some(format!("hash-{title}")),
        relevance_score: 7,
        is_relevant: true,
        detected_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn seed_is_idempotent_and_lists_active(pool: sqlx::PgPool) {
    seed(&pool).await;
    seed(&pool).await;

    let active = list_active_entities(&pool).await.unwrap();
    assert_eq!(active.len(), 2);

    set_entity_active(&pool, "nook-works", false).await.unwrap();
    let active = list_active_entities(&pool).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].slug, "desk-harbor");
}

#[sqlx::test(migrations = "../../migrations")]
async fn set_entity_active_unknown_slug_is_not_found(pool: sqlx::PgPool) {
    let err = set_entity_active(&pool, "ghost", true).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn append_snapshot_requires_current_predecessor(pool: sqlx::PgPool) {
    let entity_id = seed(&pool).await;

    let first = append_snapshot(&pool, entity_id, SourceKind::Webpage, "f1", "one", None)
        .await
        .unwrap()
        .expect("first append succeeds");

    // A second writer that also saw "no snapshot" loses.
    let stale = append_snapshot(&pool, entity_id, SourceKind::Webpage, "f2", "two", None)
        .await
        .unwrap();
    assert!(stale.is_none());

    let second = append_snapshot(
        &pool,
        entity_id,
        SourceKind::Webpage,
        "f2",
        "two",
        Some(first.id),
    )
    .await
    .unwrap()
    .expect("append with current predecessor succeeds");

    let latest = get_latest_snapshot(&pool, entity_id, SourceKind::Webpage)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, second.id);
    assert_eq!(latest.fingerprint, "f2");

    // Kinds are independent.
    assert!(get_latest_snapshot(&pool, entity_id, SourceKind::Pricing)
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn signal_dedup_lookups_respect_window(pool: sqlx::PgPool) {
    let entity_id = seed(&pool).await;
    let stored = insert_signal(&pool, &new_signal(entity_id, "vp-sales"))
        .await
        .unwrap();
    assert_eq!(stored.relevance_score, 7);

    let recent = Utc::now() - Duration::days(7);
    let future = Utc::now() + Duration::days(1);

    assert!(signal_exists_by_url(
        &pool,
        entity_id,
        SignalCategory::Hiring,
        "https://jobs.example/vp-sales",
        recent
    )
    .await
    .unwrap());
    assert!(
        signal_exists_by_title(&pool, entity_id, SignalCategory::Hiring, "vp-sales", recent)
            .await
            .unwrap()
    );
    assert!(signal_exists_by_content_hash(
        &pool,
        entity_id,
        SignalCategory::Hiring,
        "hash-vp-sales",
        recent
    )
    .await
    .unwrap());

    // Outside the window, or in another category, nothing matches.
    assert!(
        !signal_exists_by_title(&pool, entity_id, SignalCategory::Hiring, "vp-sales", future)
            .await
            .unwrap()
    );
    assert!(
        !signal_exists_by_title(&pool, entity_id, SignalCategory::Pricing, "vp-sales", recent)
            .await
            .unwrap()
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn signal_listing_filters_and_orders(pool: sqlx::PgPool) {
    let entity_id = seed(&pool).await;
    let mut older = new_signal(entity_id, "older");
    older.detected_at = Utc::now() - Duration::days(2);
    insert_signal(&pool, &older).await.unwrap();
    insert_signal(&pool, &new_signal(entity_id, "newer"))
        .await
        .unwrap();

    let all = list_signals_since(&pool, Utc::now() - Duration::days(30), 10)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].title, "newer");

    let hiring = list_entity_signals(&pool, entity_id, Some(SignalCategory::Hiring), 1)
        .await
        .unwrap();
    assert_eq!(hiring.len(), 1);

    let pricing = list_entity_signals(&pool, entity_id, Some(SignalCategory::Pricing), 10)
        .await
        .unwrap();
    assert!(pricing.is_empty());
}

// ---------------------------------------------------------------------------
// Collection runs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn collection_run_lifecycle(pool: sqlx::PgPool) {
    let entity_id = seed(&pool).await;
    let run = create_collection_run(&pool, "cli").await.unwrap();
    assert_eq!(run.status, "queued");

    // Cannot complete a run that never started.
    let err = complete_collection_run(&pool, run.id, 0).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidCollectionRunTransition {
            expected_status: "running",
            ..
        }
    ));

    start_collection_run(&pool, run.id).await.unwrap();
    upsert_collection_run_unit(&pool, run.id, entity_id, SourceKind::Hiring, "succeeded", 2, None)
        .await
        .unwrap();
    upsert_collection_run_unit(
        &pool,
        run.id,
        entity_id,
        SourceKind::Hiring,
        "failed",
        0,
        Some("timeout"),
    )
    .await
    .unwrap();
    complete_collection_run(&pool, run.id, 2).await.unwrap();

    let stored = get_collection_run(&pool, run.id).await.unwrap();
    assert_eq!(stored.status, "succeeded");
    assert_eq!(stored.signals_written, 2);

    let units = list_collection_run_units(&pool, run.id).await.unwrap();
    assert_eq!(units.len(), 1, "upsert keeps one row per unit");
    assert_eq!(units[0].status, "failed");

    let err = fail_collection_run(&pool, run.id, "late").await.unwrap_err();
    assert!(matches!(err, DbError::InvalidCollectionRunTransition { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn failed_run_keeps_message_and_timestamps(pool: sqlx::PgPool) {
    let older = create_collection_run(&pool, "scheduler").await.unwrap();
    let run = create_collection_run(&pool, "cli").await.unwrap();
    assert!(run.started_at.is_none());

    // A queued run cannot fail; only a running one can.
    let err = fail_collection_run(&pool, run.id, "boom").await.unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidCollectionRunTransition {
            expected_status: "running",
            ..
        }
    ));

    start_collection_run(&pool, run.id).await.unwrap();
    let err = start_collection_run(&pool, run.id).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidCollectionRunTransition {
            expected_status: "queued",
            ..
        }
    ));

    fail_collection_run(&pool, run.id, "entity list unreadable")
        .await
        .unwrap();
    let stored = get_collection_run(&pool, run.id).await.unwrap();
    assert_eq!(stored.status, "failed");
    assert_eq!(stored.error_message.as_deref(), Some("entity list unreadable"));
    assert_eq!(stored.signals_written, 0);
    assert!(stored.started_at.is_some());
    assert!(stored.completed_at >= stored.started_at);

    let recent = list_collection_runs(&pool, 10).await.unwrap();
    let ids: Vec<i64> = recent.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![run.id, older.id]);
    assert!(matches!(
        get_collection_run(&pool, run.id + 1_000).await,
        Err(DbError::NotFound)
    ));
}
