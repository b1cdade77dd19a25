//! `collect` command handler.
//!
//! Builds the production pipeline and runs one recorded collection run over
//! the selected entities and source kinds. Per-unit failures are recorded in
//! the run and printed; only a run where every attempted unit failed exits
//! non-zero.

use cwatch_collect::{Collector, RecordedRun, UnitReport};
use cwatch_core::{Entity, SourceKind};

/// Load the entities to process for a collect run.
///
/// A slug filter must name an existing active entity; otherwise every active
/// entity is returned.
pub(crate) async fn load_entities_for_collect(
    pool: &sqlx::PgPool,
    entity_filter: Option<&str>,
) -> anyhow::Result<Vec<Entity>> {
    if let Some(slug) = entity_filter {
        let entity = cwatch_db::get_entity_by_slug(pool, slug)
            .await?
            .ok_or_else(|| anyhow::anyhow!("entity '{slug}' not found; run `seed` first"))?;
        return Ok(vec![entity]);
    }
    Ok(cwatch_db::list_active_entities(pool).await?)
}

/// Requested kinds in declaration order without repeats; empty means all.
pub(crate) fn resolve_kinds(requested: &[SourceKind]) -> Vec<SourceKind> {
    if requested.is_empty() {
        return SourceKind::ALL.to_vec();
    }
    SourceKind::ALL
        .into_iter()
        .filter(|kind| requested.contains(kind))
        .collect()
}

/// One line per unit for dry-run output.
pub(crate) fn plan_line(entity: &Entity, kind: SourceKind) -> String {
    match Collector::new(kind).endpoint(entity) {
        Ok(endpoint) => format!("{}/{kind}: {}", entity.slug, endpoint.url),
        Err(e) => format!("{}/{kind}: skip ({e})", entity.slug),
    }
}

pub(crate) fn unit_line(report: &UnitReport) -> String {
    let unit = format!("{}/{}", report.entity_slug, report.kind);
    match (&report.skipped, report.is_failed()) {
        (Some(reason), _) => format!("{unit:<32} skipped  {reason}"),
        (None, true) => format!("{unit:<32} failed   {}", report.errors.join("; ")),
        (None, false) => format!("{unit:<32} ok       {} new", report.new_signal_count),
    }
}

fn print_run(run: &RecordedRun) {
    for report in &run.summary.reports {
        println!("{}", unit_line(report));
    }
    println!(
        "run {} {}: {} units, {} new signals, {} errors, {} skipped",
        run.run_id,
        run.status,
        run.summary.units,
        run.summary.new_signals,
        run.summary.errors.len(),
        run.summary.skipped.len()
    );
}

/// Collect `entities × kinds` as one recorded run.
///
/// # Errors
///
/// Returns an error if the entity filter does not resolve, the pipeline
/// cannot be built, the run bookkeeping fails, or every attempted unit failed.
pub(crate) async fn run_collect(
    pool: &sqlx::PgPool,
    config: &cwatch_core::AppConfig,
    entity_filter: Option<&str>,
    requested_kinds: &[SourceKind],
    dry_run: bool,
) -> anyhow::Result<()> {
    let entities = load_entities_for_collect(pool, entity_filter).await?;
    if entities.is_empty() {
        println!("no active entities found; skipping run creation");
        return Ok(());
    }
    let kinds = resolve_kinds(requested_kinds);

    if dry_run {
        println!(
            "dry-run: would collect {} units across {} entities",
            entities.len() * kinds.len(),
            entities.len()
        );
        for entity in &entities {
            for kind in &kinds {
                println!("  {}", plan_line(entity, *kind));
            }
        }
        return Ok(());
    }

    let filters = cwatch_core::load_filters(config.filters_path.as_deref())?;
    let pipeline = cwatch_collect::pg_pipeline(pool, config, &filters)?;
    let run = cwatch_collect::run_recorded_collection(
        pool,
        &pipeline,
        &entities,
        &kinds,
        config.max_concurrent_units,
        "cli",
    )
    .await?;

    print_run(&run);
    if !run.summary.errors.is_empty() {
        tracing::warn!(
            run_id = run.run_id,
            failed_units = run.summary.failed(),
            "some units failed during collection"
        );
    }
    if run.status == "failed" {
        anyhow::bail!(
            "collection run {} failed: all {} attempted units failed",
            run.run_id,
            run.summary.failed()
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
