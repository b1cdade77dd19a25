//! Persistence seams the pipeline writes through.

mod memory;
mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cwatch_core::{NewSignal, Signal, SignalCategory, Snapshot, SourceKind};

use crate::error::CollectError;

pub use memory::MemoryStore;
pub use pg::PgStore;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn latest_snapshot(
        &self,
        entity_id: i64,
        kind: SourceKind,
    ) -> Result<Option<Snapshot>, CollectError>;

    /// Append a snapshot only if the latest stored id still equals
    /// `expected_previous`. `Ok(None)` means another writer got there first.
    async fn append_snapshot(
        &self,
        entity_id: i64,
        kind: SourceKind,
        fingerprint: &str,
        raw_content: &str,
        expected_previous: Option<i64>,
    ) -> Result<Option<Snapshot>, CollectError>;
}

#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn insert_signal(&self, signal: &NewSignal) -> Result<Signal, CollectError>;

    async fn exists_by_url(
        &self,
        entity_id: i64,
        category: SignalCategory,
        url: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, CollectError>;

    async fn exists_by_title(
        &self,
        entity_id: i64,
        category: SignalCategory,
        title: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, CollectError>;

    async fn exists_by_content_hash(
        &self,
        entity_id: i64,
        category: SignalCategory,
        hash: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, CollectError>;

    /// Newest-first signals detected at or after `since`, at most `limit`.
    async fn signals_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Signal>, CollectError>;

    async fn entity_signals(
        &self,
        entity_id: i64,
        category: Option<SignalCategory>,
        limit: i64,
    ) -> Result<Vec<Signal>, CollectError>;
}
