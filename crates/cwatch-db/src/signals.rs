//! Database operations for the `signals` table.
//!
//! Signals are insert-only. Dedup lookups are scoped to `(entity_id, category)`
//! and a lower bound on `detected_at`; the caller picks the window.

use chrono::{DateTime, Utc};
use cwatch_core::{NewSignal, Signal, SignalCategory};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `signals` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SignalRow {
    pub id: i64,
    pub public_id: Uuid,
    pub entity_id: i64,
    pub category: String,
    pub title: String,
    pub summary: String,
    pub raw_payload: serde_json::Value,
    pub source_url: Option<String>,
    pub content_hash: Option<String>,
    /// The schema defines this as `SMALLINT CHECK (1..10)`.
    pub relevance_score: i16,
    pub is_relevant: bool,
    pub detected_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SignalRow> for Signal {
    type Error = DbError;

    fn try_from(row: SignalRow) -> Result<Self, Self::Error> {
        let category = row
            .category
            .parse::<SignalCategory>()
            .map_err(|e| DbError::Decode(e.to_string()))?;
        let relevance_score = u8::try_from(row.relevance_score).map_err(|_| {
            DbError::Decode(format!(
                "signal {} has relevance_score {}",
                row.id, row.relevance_score
            ))
        })?;
        Ok(Signal {
            id: row.id,
            public_id: row.public_id,
            entity_id: row.entity_id,
            category,
            title: row.title,
            summary: row.summary,
            raw_payload: row.raw_payload,
            source_url: row.source_url,
            content_hash: row.content_hash,
            relevance_score,
            is_relevant: row.is_relevant,
            detected_at: row.detected_at,
            created_at: row.created_at,
        })
    }
}

fn decode_rows(rows: Vec<SignalRow>) -> Result<Vec<Signal>, DbError> {
    rows.into_iter().map(Signal::try_from).collect()
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a scored signal and returns the persisted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_signal(pool: &PgPool, signal: &NewSignal) -> Result<Signal, DbError> {
    let row = sqlx::query_as::<_, SignalRow>(
        "INSERT INTO signals \
             (entity_id, category, title, summary, raw_payload, source_url, content_hash, \
              relevance_score, is_relevant, detected_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING id, public_id, entity_id, category, title, summary, raw_payload, source_url, \
                   content_hash, relevance_score, is_relevant, detected_at, created_at",
    )
    .bind(signal.entity_id)
    .bind(signal.category.as_str())
    .bind(&signal.title)
    .bind(&signal.summary)
    .bind(&signal.raw_payload)
    .bind(&signal.source_url)
    .bind(&signal.content_hash)
    .bind(i16::from(signal.relevance_score))
    .bind(signal.is_relevant)
    .bind(signal.detected_at)
    .fetch_one(pool)
    .await?;

    Signal::try_from(row)
}

// ---------------------------------------------------------------------------
// Dedup lookups
// ---------------------------------------------------------------------------

/// Returns `true` if a signal with the same source URL exists since `since`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn signal_exists_by_url(
    pool: &PgPool,
    entity_id: i64,
    category: SignalCategory,
    source_url: &str,
    since: DateTime<Utc>,
) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS ( \
             SELECT 1 FROM signals \
             WHERE entity_id = $1 AND category = $2 AND source_url = $3 AND detected_at >= $4 \
         )",
    )
    .bind(entity_id)
    .bind(category.as_str())
    .bind(source_url)
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Returns `true` if a signal with the same title exists since `since`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn signal_exists_by_title(
    pool: &PgPool,
    entity_id: i64,
    category: SignalCategory,
    title: &str,
    since: DateTime<Utc>,
) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS ( \
             SELECT 1 FROM signals \
             WHERE entity_id = $1 AND category = $2 AND title = $3 AND detected_at >= $4 \
         )",
    )
    .bind(entity_id)
    .bind(category.as_str())
    .bind(title)
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Returns `true` if a signal with the same content hash exists since `since`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn signal_exists_by_content_hash(
    pool: &PgPool,
    entity_id: i64,
    category: SignalCategory,
    content_hash: &str,
    since: DateTime<Utc>,
) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS ( \
             SELECT 1 FROM signals \
             WHERE entity_id = $1 AND category = $2 AND content_hash = $3 AND detected_at >= $4 \
         )",
    )
    .bind(entity_id)
    .bind(category.as_str())
    .bind(content_hash)
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns up to `limit` signals detected at or after `since`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] on a corrupt row.
pub async fn list_signals_since(
    pool: &PgPool,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Signal>, DbError> {
    let rows = sqlx::query_as::<_, SignalRow>(
        "SELECT id, public_id, entity_id, category, title, summary, raw_payload, source_url, \
                content_hash, relevance_score, is_relevant, detected_at, created_at \
         FROM signals \
         WHERE detected_at >= $1 \
         ORDER BY detected_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    decode_rows(rows)
}

/// Returns the newest signals for one entity, optionally narrowed to a category.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] on a corrupt row.
pub async fn list_entity_signals(
    pool: &PgPool,
    entity_id: i64,
    category: Option<SignalCategory>,
    limit: i64,
) -> Result<Vec<Signal>, DbError> {
    let rows = sqlx::query_as::<_, SignalRow>(
        "SELECT id, public_id, entity_id, category, title, summary, raw_payload, source_url, \
                content_hash, relevance_score, is_relevant, detected_at, created_at \
         FROM signals \
         WHERE entity_id = $1 AND ($2::TEXT IS NULL OR category = $2) \
         ORDER BY detected_at DESC, id DESC \
         LIMIT $3",
    )
    .bind(entity_id)
    .bind(category.map(SignalCategory::as_str))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    decode_rows(rows)
}
