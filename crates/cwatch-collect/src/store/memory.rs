use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cwatch_core::{NewSignal, Signal, SignalCategory, Snapshot, SourceKind};
use uuid::Uuid;

use super::{SignalStore, SnapshotStore};
use crate::error::CollectError;

/// In-process store with the same semantics as the Postgres one.
///
/// Used by tests and dry runs. Never fails.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    snapshots: Vec<Snapshot>,
    signals: Vec<Signal>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn latest(&self, entity_id: i64, kind: SourceKind) -> Option<&Snapshot> {
        self.snapshots
            .iter()
            .filter(|s| s.entity_id == entity_id && s.source_kind == kind)
            .max_by_key(|s| (s.created_at, s.id))
    }

    fn any_signal(
        &self,
        entity_id: i64,
        category: SignalCategory,
        since: DateTime<Utc>,
        pred: impl Fn(&Signal) -> bool,
    ) -> bool {
        self.signals.iter().any(|s| {
            s.entity_id == entity_id && s.category == category && s.detected_at >= since && pred(s)
        })
    }
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every stored signal, oldest first.
    #[must_use]
    pub fn all_signals(&self) -> Vec<Signal> {
        self.lock().signals.clone()
    }

    /// Number of snapshots held for one unit.
    #[must_use]
    pub fn snapshot_count(&self, entity_id: i64, kind: SourceKind) -> usize {
        self.lock()
            .snapshots
            .iter()
            .filter(|s| s.entity_id == entity_id && s.source_kind == kind)
            .count()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn latest_snapshot(
        &self,
        entity_id: i64,
        kind: SourceKind,
    ) -> Result<Option<Snapshot>, CollectError> {
        Ok(self.lock().latest(entity_id, kind).cloned())
    }

    async fn append_snapshot(
        &self,
        entity_id: i64,
        kind: SourceKind,
        fingerprint: &str,
        raw_content: &str,
        expected_previous: Option<i64>,
    ) -> Result<Option<Snapshot>, CollectError> {
        let mut inner = self.lock();
        if inner.latest(entity_id, kind).map(|s| s.id) != expected_previous {
            return Ok(None);
        }
        let snapshot = Snapshot {
            id: inner.next_id(),
            entity_id,
            source_kind: kind,
            fingerprint: fingerprint.to_string(),
            raw_content: raw_content.to_string(),
            created_at: Utc::now(),
        };
        inner.snapshots.push(snapshot.clone());
        Ok(Some(snapshot))
    }
}

#[async_trait]
impl SignalStore for MemoryStore {
    async fn insert_signal(&self, signal: &NewSignal) -> Result<Signal, CollectError> {
        let mut inner = self.lock();
        let stored = Signal {
            id: inner.next_id(),
            public_id: Uuid::new_v4(),
            entity_id: signal.entity_id,
            category: signal.category,
            title: signal.title.clone(),
            summary: signal.summary.clone(),
            raw_payload: signal.raw_payload.clone(),
            source_url: signal.source_url.clone(),
            content_hash: signal.content_hash.clone(),
            relevance_score: signal.relevance_score,
            is_relevant: signal.is_relevant,
            detected_at: signal.detected_at,
            created_at: Utc::now(),
        };
        inner.signals.push(stored.clone());
        Ok(stored)
    }

    async fn exists_by_url(
        &self,
        entity_id: i64,
        category: SignalCategory,
        url: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, CollectError> {
        Ok(self.lock().any_signal(entity_id, category, since, |s| {
            s.source_url.as_deref() == Some(url)
        }))
    }

    async fn exists_by_title(
        &self,
        entity_id: i64,
        category: SignalCategory,
        title: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, CollectError> {
        Ok(self
            .lock()
            .any_signal(entity_id, category, since, |s| s.title == title))
    }

    async fn exists_by_content_hash(
        &self,
        entity_id: i64,
        category: SignalCategory,
        hash: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, CollectError> {
        Ok(self.lock().any_signal(entity_id, category, since, |s| {
            s.content_hash.as_deref() == Some(hash)
        }))
    }

    async fn signals_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Signal>, CollectError> {
        let mut found: Vec<Signal> = self
            .lock()
            .signals
            .iter()
            .filter(|s| s.detected_at >= since)
            .cloned()
            .collect();
        newest_first(&mut found, limit);
        Ok(found)
    }

    async fn entity_signals(
        &self,
        entity_id: i64,
        category: Option<SignalCategory>,
        limit: i64,
    ) -> Result<Vec<Signal>, CollectError> {
        let mut found: Vec<Signal> = self
            .lock()
            .signals
            .iter()
            .filter(|s| s.entity_id == entity_id && category.is_none_or(|c| s.category == c))
            .cloned()
            .collect();
        newest_first(&mut found, limit);
        Ok(found)
    }
}

fn newest_first(signals: &mut Vec<Signal>, limit: i64) {
    signals.sort_by(|a, b| (b.detected_at, b.id).cmp(&(a.detected_at, a.id)));
    signals.truncate(usize::try_from(limit).unwrap_or(0));
}
