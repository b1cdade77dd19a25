//! Background job scheduler.
//!
//! Registers the recurring collection job at server startup. The job shares
//! the API's pipeline, so on-demand and scheduled units for the same
//! (entity, source kind) serialize on one lock table.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::AppState;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(state: AppState) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_collection_job(&scheduler, state).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the periodic all-entities, all-kinds collection run on
/// `CWATCH_COLLECT_CRON`.
async fn register_collection_job(
    scheduler: &JobScheduler,
    state: AppState,
) -> Result<(), JobSchedulerError> {
    let cron = state.config.collect_cron.clone();
    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let state = state.clone();
        Box::pin(async move {
            tracing::info!("scheduler: starting collection run");
            run_collection_job(&state).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: collection job registered");
    Ok(())
}

async fn run_collection_job(state: &AppState) {
    let entities = match cwatch_db::list_active_entities(&state.pool).await {
        Ok(entities) => entities,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to load active entities");
            return;
        }
    };
    if entities.is_empty() {
        tracing::info!("scheduler: no active entities; skipping");
        return;
    }

    match cwatch_collect::run_recorded_collection(
        &state.pool,
        &state.pipeline,
        &entities,
        &cwatch_core::SourceKind::ALL,
        state.config.max_concurrent_units,
        "scheduler",
    )
    .await
    {
        Ok(run) => tracing::info!(
            run_id = run.run_id,
            status = run.status,
            new_signals = run.summary.new_signals,
            errors = run.summary.errors.len(),
            skipped = run.summary.skipped.len(),
            "scheduler: collection run complete"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: collection run could not be recorded"),
    }
}
