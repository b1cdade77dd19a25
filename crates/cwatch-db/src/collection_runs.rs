//! Run bookkeeping: one `collection_runs` row per batch collection and one
//! `collection_run_units` row per (entity, source kind) the batch touched.
//!
//! Status only ever moves forward: `queued` to `running`, then to exactly one
//! of `succeeded` or `failed`. Every transition is a guarded `UPDATE` that
//! names the status it expects to leave, so a stale caller gets
//! [`DbError::InvalidCollectionRunTransition`] instead of rewriting history.

use chrono::{DateTime, Utc};
use cwatch_core::SourceKind;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const RUN_COLUMNS: &str = "id, public_id, trigger_source, status, \
     started_at, completed_at, signals_written, error_message, created_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionRunRow {
    pub id: i64,
    pub public_id: Uuid,
    /// Who asked for the run: `cli` or `scheduler`.
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub signals_written: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a single unit inside a run; status is `succeeded`, `failed` or `skipped`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionRunUnitRow {
    pub id: i64,
    pub collection_run_id: i64,
    pub entity_id: i64,
    pub source_kind: String,
    pub status: String,
    pub signals_written: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Open a run. It stays `queued` until [`start_collection_run`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_collection_run(
    pool: &PgPool,
    trigger_source: &str,
) -> Result<CollectionRunRow, DbError> {
    let sql = format!(
        "INSERT INTO collection_runs (public_id, trigger_source, status) \
         VALUES ($1, $2, 'queued') RETURNING {RUN_COLUMNS}"
    );
    let row = sqlx::query_as::<_, CollectionRunRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(trigger_source)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

/// `queued -> running`; stamps `started_at`.
///
/// # Errors
///
/// [`DbError::InvalidCollectionRunTransition`] when the run is not queued.
pub async fn start_collection_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    transition(pool, id, "queued", "running", None, None).await
}

/// `running -> succeeded`; stamps `completed_at` and the run's signal total.
///
/// # Errors
///
/// [`DbError::InvalidCollectionRunTransition`] when the run is not running.
pub async fn complete_collection_run(
    pool: &PgPool,
    id: i64,
    signals_written: i32,
) -> Result<(), DbError> {
    transition(pool, id, "running", "succeeded", Some(signals_written), None).await
}

/// `running -> failed`; stamps `completed_at` and keeps `error_message`.
///
/// # Errors
///
/// [`DbError::InvalidCollectionRunTransition`] when the run is not running.
pub async fn fail_collection_run(
    pool: &PgPool,
    id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    transition(pool, id, "running", "failed", None, Some(error_message)).await
}

async fn transition(
    pool: &PgPool,
    id: i64,
    from: &'static str,
    to: &'static str,
    signals_written: Option<i32>,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_runs SET \
             status          = $3::text, \
             started_at      = CASE WHEN $3::text = 'running' THEN NOW() ELSE started_at END, \
             completed_at    = CASE WHEN $3::text = 'running' THEN completed_at ELSE NOW() END, \
             signals_written = COALESCE($4, signals_written), \
             error_message   = COALESCE($5, error_message) \
         WHERE id = $1 AND status = $2",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(signals_written)
    .bind(error_message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCollectionRunTransition {
            id,
            expected_status: from,
        });
    }
    Ok(())
}

/// # Errors
///
/// [`DbError::NotFound`] for an unknown id; [`DbError::Sqlx`] otherwise.
pub async fn get_collection_run(pool: &PgPool, id: i64) -> Result<CollectionRunRow, DbError> {
    let sql = format!("SELECT {RUN_COLUMNS} FROM collection_runs WHERE id = $1");
    sqlx::query_as::<_, CollectionRunRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Newest runs first, at most `limit`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_collection_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<CollectionRunRow>, DbError> {
    let sql = format!(
        "SELECT {RUN_COLUMNS} FROM collection_runs \
         ORDER BY created_at DESC, id DESC LIMIT $1"
    );
    let rows = sqlx::query_as::<_, CollectionRunRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Record a unit's outcome. A unit reported twice in the same run keeps only
/// the last report.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the write fails.
pub async fn upsert_collection_run_unit(
    pool: &PgPool,
    run_id: i64,
    entity_id: i64,
    kind: SourceKind,
    status: &str,
    signals_written: i32,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO collection_run_units \
             (collection_run_id, entity_id, source_kind, status, signals_written, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (collection_run_id, entity_id, source_kind) DO UPDATE SET \
             status          = EXCLUDED.status, \
             signals_written = EXCLUDED.signals_written, \
             error_message   = EXCLUDED.error_message",
    )
    .bind(run_id)
    .bind(entity_id)
    .bind(kind.as_str())
    .bind(status)
    .bind(signals_written)
    .bind(error_message)
    .execute(pool)
    .await?;
    Ok(())
}

/// Unit rows of one run, grouped by entity.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_collection_run_units(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<CollectionRunUnitRow>, DbError> {
    let rows = sqlx::query_as::<_, CollectionRunUnitRow>(
        "SELECT id, collection_run_id, entity_id, source_kind, status, signals_written, \
                error_message, created_at \
         FROM collection_run_units \
         WHERE collection_run_id = $1 \
         ORDER BY entity_id, source_kind",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
