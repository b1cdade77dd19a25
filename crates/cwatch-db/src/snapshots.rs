//! Database operations for the append-only `snapshots` table.
//!
//! A snapshot is only appended when the caller's view of the latest snapshot
//! is still current. Two writers that read the same previous snapshot race on
//! a transaction-scoped advisory lock; the loser sees a different latest id
//! and gets `None` back.

use chrono::{DateTime, Utc};
use cwatch_core::{Snapshot, SourceKind};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub id: i64,
    pub entity_id: i64,
    pub source_kind: String,
    pub fingerprint: String,
    pub raw_content: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SnapshotRow> for Snapshot {
    type Error = DbError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let source_kind = row
            .source_kind
            .parse::<SourceKind>()
            .map_err(|e| DbError::Decode(e.to_string()))?;
        Ok(Snapshot {
            id: row.id,
            entity_id: row.entity_id,
            source_kind,
            fingerprint: row.fingerprint,
            raw_content: row.raw_content,
            created_at: row.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns the most recent snapshot for `(entity_id, kind)`, or `None` if the
/// unit has never been captured.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] if the
/// stored source kind is not recognised.
pub async fn get_latest_snapshot(
    pool: &PgPool,
    entity_id: i64,
    kind: SourceKind,
) -> Result<Option<Snapshot>, DbError> {
    let row = sqlx::query_as::<_, SnapshotRow>(
        "SELECT id, entity_id, source_kind, fingerprint, raw_content, created_at \
         FROM snapshots \
         WHERE entity_id = $1 AND source_kind = $2 \
         ORDER BY created_at DESC, id DESC \
         LIMIT 1",
    )
    .bind(entity_id)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(Snapshot::try_from).transpose()
}

/// Appends a snapshot if the latest stored snapshot id still equals
/// `expected_previous` (`None` meaning "no snapshot yet").
///
/// Returns the inserted snapshot, or `None` when another writer appended first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the transaction fails.
pub async fn append_snapshot(
    pool: &PgPool,
    entity_id: i64,
    kind: SourceKind,
    fingerprint: &str,
    raw_content: &str,
    expected_previous: Option<i64>,
) -> Result<Option<Snapshot>, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("{}:{entity_id}", kind.as_str()))
        .execute(&mut *tx)
        .await?;

    let row = sqlx::query_as::<_, SnapshotRow>(
        "WITH last AS ( \
             SELECT id FROM snapshots \
             WHERE entity_id = $1 AND source_kind = $2 \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1 \
         ) \
         INSERT INTO snapshots (entity_id, source_kind, fingerprint, raw_content) \
         SELECT $1, $2, $3, $4 \
         WHERE (SELECT id FROM last) IS NOT DISTINCT FROM $5::BIGINT \
         RETURNING id, entity_id, source_kind, fingerprint, raw_content, created_at",
    )
    .bind(entity_id)
    .bind(kind.as_str())
    .bind(fingerprint)
    .bind(raw_content)
    .bind(expected_previous)
    .fetch_optional(&mut *tx)
    .await?;

    tx.commit().await?;

    row.map(Snapshot::try_from).transpose()
}
