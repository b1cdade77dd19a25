//! Offline tests for cwatch-db pool configuration and row conversions.
//! These tests do not require a live database connection.

use chrono::Utc;
use cwatch_core::{AppConfig, Entity, Environment, Signal, SignalCategory, Snapshot, SourceKind};
use cwatch_db::{DbError, EntityRow, PoolConfig, SignalRow, SnapshotRow};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        entities_path: PathBuf::from("./config/entities.yaml"),
        filters_path: None,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        fetch_timeout_secs: 30,
        fetch_user_agent: "ua".to_string(),
        render_proxy_url: None,
        fetch_max_retries: 2,
        fetch_backoff_ms: 1000,
        max_concurrent_units: 4,
        classifier_url: None,
        classifier_api_key: None,
        classifier_model: "gpt-4o-mini".to_string(),
        classifier_timeout_secs: 45,
        classifier_max_retries: 2,
        min_signal_score: 3,
        signal_retention_days: 90,
        hash_dedup_days: 7,
        pattern_window_days: 30,
        pattern_signal_cap: 300,
        collect_cron: "0 0 */6 * * *".to_string(),
    }
}

fn signal_row(category: &str, relevance_score: i16) -> SignalRow {
    SignalRow {
        id: 11,
        public_id: Uuid::new_v4(),
        entity_id: 3,
        category: category.to_string(),
        title: "Acme hires VP Sales".to_string(),
        summary: "New sales leadership".to_string(),
        raw_payload: serde_json::json!({"title": "VP Sales"}),
        source_url: Some("https://jobs.example/1".to_string()),
        content_hash: None,
        relevance_score,
        is_relevant: true,
        detected_at: Utc::now(),
        created_at: Utc::now(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn entity_row_converts_to_domain_entity() {
    let row = EntityRow {
        id: 5,
        public_id: Uuid::new_v4(),
        name: "Desk Harbor".to_string(),
        slug: "desk-harbor".to_string(),
        website: "https://deskharbor.example".to_string(),
        careers_url: Some("https://boards.example/deskharbor".to_string()),
        listings_url: None,
        social_handle: None,
        app_id: Some("123".to_string()),
        reviews_url: None,
        regulatory_id: None,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let entity = Entity::from(row);
    assert_eq!(entity.id, 5);
    assert_eq!(entity.slug, "desk-harbor");
    assert_eq!(entity.app_id.as_deref(), Some("123"));
    assert!(entity.listings_url.is_none());
}

#[test]
fn signal_row_decodes_category_and_score() {
    let signal = Signal::try_from(signal_row("hiring", 7)).unwrap();
    assert_eq!(signal.category, SignalCategory::Hiring);
    assert_eq!(signal.relevance_score, 7);
    assert!(signal.is_relevant);
}

#[test]
fn signal_row_with_unknown_category_is_a_decode_error() {
    let err = Signal::try_from(signal_row("astrology", 7)).unwrap_err();
    assert!(matches!(err, DbError::Decode(_)), "got: {err:?}");
}

#[test]
fn signal_row_with_negative_score_is_a_decode_error() {
    let err = Signal::try_from(signal_row("pricing", -1)).unwrap_err();
    assert!(matches!(err, DbError::Decode(ref msg) if msg.contains("relevance_score")));
}

#[test]
fn snapshot_row_decodes_source_kind() {
    let row = SnapshotRow {
        id: 1,
        entity_id: 2,
        source_kind: "app_listing".to_string(),
        fingerprint: "abc".to_string(),
        raw_content: "{}".to_string(),
        created_at: Utc::now(),
    };
    let snapshot = Snapshot::try_from(row).unwrap();
    assert_eq!(snapshot.source_kind, SourceKind::AppListing);
}
