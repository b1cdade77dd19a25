//! Deduplication guard run before every signal insert.
//!
//! Checks, in order and stopping at the first hit: source URL, title, then
//! content hash. URL and title use the retention window; the content hash
//! uses a shorter rolling window.
//!
//! Title matching is exact. The hash key is lowercased, so within its window
//! it also catches re-scrapes whose wording drifted only in letter case. An
//! exact repeat is always stopped by the title check first.

use chrono::{DateTime, Duration, Utc};
use cwatch_core::{SignalCandidate, SignalCategory};
use sha2::{Digest, Sha256};

use crate::error::CollectError;
use crate::store::SignalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupPolicy {
    pub retention: Duration,
    pub hash_window: Duration,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self {
            retention: Duration::days(90),
            hash_window: Duration::days(7),
        }
    }
}

impl DedupPolicy {
    #[must_use]
    pub fn from_app_config(config: &cwatch_core::AppConfig) -> Self {
        Self {
            retention: Duration::days(config.signal_retention_days),
            hash_window: Duration::days(config.hash_dedup_days),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateReason {
    Url,
    Title,
    ContentHash,
}

impl DuplicateReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DuplicateReason::Url => "url",
            DuplicateReason::Title => "title",
            DuplicateReason::ContentHash => "content_hash",
        }
    }
}

/// Hash of a category-specific identity key, scoped to entity and category.
///
/// Keys are trimmed and lowercased first, so cosmetic case differences in a
/// job title or location do not defeat the check.
#[must_use]
pub fn content_hash(entity_id: i64, category: SignalCategory, key: &str) -> String {
    let material = format!(
        "{entity_id}|{}|{}",
        category.as_str(),
        key.trim().to_lowercase()
    );
    format!("{:x}", Sha256::digest(material.as_bytes()))
}

/// Returns the first dedup rule the candidate trips, or `None` if it is new.
///
/// # Errors
///
/// Returns [`CollectError::Store`] if a lookup fails.
pub async fn find_duplicate(
    store: &dyn SignalStore,
    entity_id: i64,
    candidate: &SignalCandidate,
    hash: Option<&str>,
    policy: DedupPolicy,
    now: DateTime<Utc>,
) -> Result<Option<DuplicateReason>, CollectError> {
    let retention_start = now - policy.retention;
    let category = candidate.category;

    if let Some(url) = candidate.source_url.as_deref() {
        if store
            .exists_by_url(entity_id, category, url, retention_start)
            .await?
        {
            return Ok(Some(DuplicateReason::Url));
        }
    }

    if store
        .exists_by_title(entity_id, category, &candidate.title, retention_start)
        .await?
    {
        return Ok(Some(DuplicateReason::Title));
    }

    if let Some(hash) = hash {
        if store
            .exists_by_content_hash(entity_id, category, hash, now - policy.hash_window)
            .await?
        {
            return Ok(Some(DuplicateReason::ContentHash));
        }
    }

    Ok(None)
}
