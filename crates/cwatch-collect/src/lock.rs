//! Per-(entity, source kind) serialization.
//!
//! Every unit of work holds the lock for its key from the snapshot read
//! through the last signal write. Different keys never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use cwatch_core::SourceKind;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Key = (i64, SourceKind);

#[derive(Debug, Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<Key, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `(entity_id, kind)`.
    pub async fn acquire(&self, entity_id: i64, kind: SourceKind) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry((entity_id, kind)).or_default())
        };
        slot.lock_owned().await
    }

    /// Number of keys that have ever been locked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
