use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cwatch_core::{NewSignal, Signal, SignalCategory, Snapshot, SourceKind};
use sqlx::PgPool;

use super::{SignalStore, SnapshotStore};
use crate::error::CollectError;

/// Postgres-backed stores over the `cwatch-db` queries.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SnapshotStore for PgStore {
    async fn latest_snapshot(
        &self,
        entity_id: i64,
        kind: SourceKind,
    ) -> Result<Option<Snapshot>, CollectError> {
        Ok(cwatch_db::get_latest_snapshot(&self.pool, entity_id, kind).await?)
    }

    async fn append_snapshot(
        &self,
        entity_id: i64,
        kind: SourceKind,
        fingerprint: &str,
        raw_content: &str,
        expected_previous: Option<i64>,
    ) -> Result<Option<Snapshot>, CollectError> {
        Ok(cwatch_db::append_snapshot(
            &self.pool,
            entity_id,
            kind,
            fingerprint,
            raw_content,
            expected_previous,
        )
        .await?)
    }
}

#[async_trait]
impl SignalStore for PgStore {
    async fn insert_signal(&self, signal: &NewSignal) -> Result<Signal, CollectError> {
        Ok(cwatch_db::insert_signal(&self.pool, signal).await?)
    }

    async fn exists_by_url(
        &self,
        entity_id: i64,
        category: SignalCategory,
        url: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, CollectError> {
        Ok(cwatch_db::signal_exists_by_url(&self.pool, entity_id, category, url, since).await?)
    }

    async fn exists_by_title(
        &self,
        entity_id: i64,
        category: SignalCategory,
        title: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, CollectError> {
        Ok(cwatch_db::signal_exists_by_title(&self.pool, entity_id, category, title, since).await?)
    }

    async fn exists_by_content_hash(
        &self,
        entity_id: i64,
        category: SignalCategory,
        hash: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, CollectError> {
        Ok(
            cwatch_db::signal_exists_by_content_hash(&self.pool, entity_id, category, hash, since)
                .await?,
        )
    }

    async fn signals_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Signal>, CollectError> {
        Ok(cwatch_db::list_signals_since(&self.pool, since, limit).await?)
    }

    async fn entity_signals(
        &self,
        entity_id: i64,
        category: Option<SignalCategory>,
        limit: i64,
    ) -> Result<Vec<Signal>, CollectError> {
        Ok(cwatch_db::list_entity_signals(&self.pool, entity_id, category, limit).await?)
    }
}
