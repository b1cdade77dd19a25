//! Collection runs recorded in `collection_runs` / `collection_run_units`.

use std::sync::Arc;

use cwatch_core::{AppConfig, Entity, FilterConfig, SourceKind};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::CollectError;
use crate::fetch::{HttpFetcher, HttpFetcherConfig};
use crate::pipeline::{collect_all, CollectRunSummary, Pipeline, PipelineSettings};
use crate::scorer::build_scorer;
use crate::store::PgStore;

/// Production wiring: HTTP fetcher, configured scorer, Postgres stores.
///
/// # Errors
///
/// Returns [`CollectError::Http`] if an HTTP client cannot be built.
pub fn pg_pipeline(
    pool: &PgPool,
    config: &AppConfig,
    filters: &FilterConfig,
) -> Result<Pipeline, CollectError> {
    let fetcher = HttpFetcher::new(HttpFetcherConfig::from_app_config(config))?;
    let scorer = build_scorer(config, filters)?;
    let store = Arc::new(PgStore::new(pool.clone()));
    Ok(Pipeline::new(
        Arc::new(fetcher),
        scorer,
        store.clone(),
        store,
        PipelineSettings::from_app_config(config),
    ))
}

/// A finished, recorded run.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedRun {
    pub run_id: i64,
    pub public_id: Uuid,
    /// `succeeded` or `failed`.
    pub status: &'static str,
    pub summary: CollectRunSummary,
}

/// Mark a run failed; a failure to do so is logged, not propagated.
async fn fail_run_best_effort(pool: &PgPool, run_id: i64, message: &str) {
    if let Err(mark_err) = cwatch_db::fail_collection_run(pool, run_id, message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark collection run as failed"
        );
    }
}

/// Run `entities × kinds` as one recorded collection run.
///
/// The run is marked failed only when every attempted unit failed; partial
/// failure still completes it. Per-unit outcomes are stored either way.
///
/// # Errors
///
/// Returns [`CollectError::Store`] if the run bookkeeping itself cannot be
/// written. Unit failures never surface here.
pub async fn run_recorded_collection(
    pool: &PgPool,
    pipeline: &Pipeline,
    entities: &[Entity],
    kinds: &[SourceKind],
    max_concurrent: usize,
    trigger_source: &str,
) -> Result<RecordedRun, CollectError> {
    let run = cwatch_db::create_collection_run(pool, trigger_source).await?;
    if let Err(e) = cwatch_db::start_collection_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, &e.to_string()).await;
        return Err(e.into());
    }
    tracing::info!(
        run_id = run.id,
        trigger = trigger_source,
        entities = entities.len(),
        kinds = kinds.len(),
        "collection run started"
    );

    let summary = collect_all(pipeline, entities, kinds, max_concurrent).await;

    for report in &summary.reports {
        let error_message = if let Some(reason) = &report.skipped {
            Some(reason.clone())
        } else if report.is_failed() {
            Some(report.errors.join("; "))
        } else {
            None
        };
        let signals_written = i32::try_from(report.new_signal_count).unwrap_or(i32::MAX);
        if let Err(e) = cwatch_db::upsert_collection_run_unit(
            pool,
            run.id,
            report.entity_id,
            report.kind,
            report.status(),
            signals_written,
            error_message.as_deref(),
        )
        .await
        {
            fail_run_best_effort(pool, run.id, &e.to_string()).await;
            return Err(e.into());
        }
    }

    let attempted = summary.attempted();
    let failed = summary.failed();
    if attempted > 0 && failed == attempted {
        let message = format!("all {failed} attempted units failed");
        tracing::error!(run_id = run.id, "{message}");
        fail_run_best_effort(pool, run.id, &message).await;
        return Ok(RecordedRun {
            run_id: run.id,
            public_id: run.public_id,
            status: "failed",
            summary,
        });
    }

    let signals_written = i32::try_from(summary.new_signals).unwrap_or(i32::MAX);
    if let Err(e) = cwatch_db::complete_collection_run(pool, run.id, signals_written).await {
        fail_run_best_effort(pool, run.id, &e.to_string()).await;
        return Err(e.into());
    }
    tracing::info!(
        run_id = run.id,
        new_signals = summary.new_signals,
        failed_units = failed,
        "collection run succeeded"
    );

    Ok(RecordedRun {
        run_id: run.id,
        public_id: run.public_id,
        status: "succeeded",
        summary,
    })
}
