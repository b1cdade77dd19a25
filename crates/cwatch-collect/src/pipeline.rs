//! Signal writer and per-unit orchestration.
//!
//! One unit is one (entity, source kind) pair. Within a unit the steps run in
//! order: resolve endpoint, fetch, canonicalize, compare against the latest
//! snapshot, score, dedup, write. Units are independent; a failing unit is
//! reported, never raised.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cwatch_core::{Entity, NewSignal, Signal, SignalCandidate, SourceKind};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::canonical::fingerprint;
use crate::collector::{CollectMode, Collector};
use crate::dedup::{content_hash, find_duplicate, DedupPolicy, DuplicateReason};
use crate::error::CollectError;
use crate::fetch::Fetcher;
use crate::lock::KeyedLocks;
use crate::scorer::RelevanceScorer;
use crate::store::{SignalStore, SnapshotStore};

/// Tunables applied to every unit of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Candidates scored below this are dropped without being written.
    pub min_signal_score: u8,
    pub dedup: DedupPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            min_signal_score: 3,
            dedup: DedupPolicy::default(),
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &cwatch_core::AppConfig) -> Self {
        Self {
            min_signal_score: config.min_signal_score,
            dedup: DedupPolicy::from_app_config(config),
        }
    }
}

/// What happened to one candidate handed to the signal writer.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    Written(Box<Signal>),
    Duplicate(DuplicateReason),
    BelowThreshold(u8),
}

/// Result of collecting one (entity, source kind) unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub entity_id: i64,
    pub entity_slug: String,
    pub kind: SourceKind,
    pub new_signal_count: usize,
    pub errors: Vec<String>,
    /// Set when the unit was not attempted, with the reason.
    pub skipped: Option<String>,
}

impl UnitReport {
    fn new(entity: &Entity, kind: SourceKind) -> Self {
        Self {
            entity_id: entity.id,
            entity_slug: entity.slug.clone(),
            kind,
            new_signal_count: 0,
            errors: Vec::new(),
            skipped: None,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    /// `succeeded`, `failed` or `skipped`, as recorded per unit.
    #[must_use]
    pub fn status(&self) -> &'static str {
        if self.is_skipped() {
            "skipped"
        } else if self.is_failed() {
            "failed"
        } else {
            "succeeded"
        }
    }
}

/// Totals for a batch of units.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectRunSummary {
    pub units: usize,
    pub new_signals: usize,
    /// `slug/kind: message` for every unit error.
    pub errors: Vec<String>,
    /// `slug/kind: reason` for every skipped unit.
    pub skipped: Vec<String>,
    pub reports: Vec<UnitReport>,
}

impl CollectRunSummary {
    fn from_reports(reports: Vec<UnitReport>) -> Self {
        let mut summary = Self {
            units: reports.len(),
            ..Self::default()
        };
        for report in &reports {
            summary.new_signals += report.new_signal_count;
            let unit = format!("{}/{}", report.entity_slug, report.kind);
            summary
                .errors
                .extend(report.errors.iter().map(|e| format!("{unit}: {e}")));
            if let Some(reason) = &report.skipped {
                summary.skipped.push(format!("{unit}: {reason}"));
            }
        }
        summary.reports = reports;
        summary
    }

    /// Units that were attempted, i.e. not skipped.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_skipped()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failed()).count()
    }
}

/// The collection pipeline with its collaborators injected.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    scorer: Arc<dyn RelevanceScorer>,
    signals: Arc<dyn SignalStore>,
    snapshots: Arc<dyn SnapshotStore>,
    locks: Arc<KeyedLocks>,
    settings: PipelineSettings,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        scorer: Arc<dyn RelevanceScorer>,
        signals: Arc<dyn SignalStore>,
        snapshots: Arc<dyn SnapshotStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetcher,
            scorer,
            signals,
            snapshots,
            locks: Arc::new(KeyedLocks::new()),
            settings,
        }
    }

    /// Dedup, score, threshold, then insert one candidate.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Store`] if a dedup lookup or the insert fails.
    pub async fn write_signal(
        &self,
        entity: &Entity,
        candidate: SignalCandidate,
        now: DateTime<Utc>,
    ) -> Result<WriteOutcome, CollectError> {
        let hash = candidate
            .dedup_key
            .as_deref()
            .map(|key| content_hash(entity.id, candidate.category, key));

        if let Some(reason) = find_duplicate(
            self.signals.as_ref(),
            entity.id,
            &candidate,
            hash.as_deref(),
            self.settings.dedup,
            now,
        )
        .await?
        {
            tracing::debug!(
                entity = %entity.slug,
                category = %candidate.category,
                reason = reason.as_str(),
                title = %candidate.title,
                "duplicate signal skipped"
            );
            return Ok(WriteOutcome::Duplicate(reason));
        }

        let relevance = self
            .scorer
            .score(
                candidate.category,
                &candidate.title,
                &candidate.content,
                &entity.name,
            )
            .await;

        if relevance.score < self.settings.min_signal_score {
            tracing::debug!(
                entity = %entity.slug,
                category = %candidate.category,
                score = relevance.score,
                title = %candidate.title,
                "signal below minimum score"
            );
            return Ok(WriteOutcome::BelowThreshold(relevance.score));
        }

        let summary = if candidate.summary.trim().is_empty() {
            relevance.summary
        } else {
            candidate.summary
        };
        let signal = self
            .signals
            .insert_signal(&NewSignal {
                entity_id: entity.id,
                category: candidate.category,
                title: candidate.title,
                summary,
                raw_payload: candidate.raw_payload,
                source_url: candidate.source_url,
                content_hash: hash,
                relevance_score: relevance.score,
                is_relevant: relevance.is_relevant,
                detected_at: candidate.detected_at,
            })
            .await?;

        tracing::info!(
            entity = %entity.slug,
            category = %signal.category,
            score = signal.relevance_score,
            title = %signal.title,
            "signal written"
        );
        Ok(WriteOutcome::Written(Box::new(signal)))
    }

    /// Collect one (entity, source kind) unit. Never fails; problems land in
    /// the report.
    pub async fn collect_for_entity(&self, entity: &Entity, kind: SourceKind) -> UnitReport {
        let mut report = UnitReport::new(entity, kind);
        match self.run_unit(entity, kind, &mut report).await {
            Ok(()) => {}
            Err(CollectError::MissingEndpoint { field, .. }) => {
                tracing::debug!(entity = %entity.slug, %kind, field, "unit skipped");
                report.skipped = Some(format!("{field} not configured"));
            }
            Err(e) => {
                tracing::warn!(entity = %entity.slug, %kind, error = %e, "unit failed");
                report.errors.push(e.to_string());
            }
        }
        report
    }

    async fn run_unit(
        &self,
        entity: &Entity,
        kind: SourceKind,
        report: &mut UnitReport,
    ) -> Result<(), CollectError> {
        let collector = Collector::new(kind);
        let endpoint = collector.endpoint(entity)?;
        let raw = self
            .fetcher
            .fetch_raw(&endpoint.url, &endpoint.options)
            .await?;

        let now = Utc::now();
        let candidates = match collector.mode() {
            CollectMode::Discovery => collector.discover(entity, &raw, now)?,
            CollectMode::Snapshot { baseline } => {
                let Some(canonical) = collector.canonicalize(&raw) else {
                    tracing::debug!(entity = %entity.slug, %kind, url = %endpoint.url, "no recognizable content");
                    report.skipped = Some("no recognizable content".to_string());
                    return Ok(());
                };
                let print = fingerprint(&canonical);

                let _guard = self.locks.acquire(entity.id, kind).await;
                let previous = self.snapshots.latest_snapshot(entity.id, kind).await?;
                let previous_id = previous.as_ref().map(|s| s.id);
                let candidate = match previous {
                    None if baseline => collector.baseline(entity, &endpoint.url, &canonical, now),
                    None => None,
                    Some(prev) if prev.fingerprint == print => None,
                    Some(prev) => {
                        collector.diff(entity, &endpoint.url, &prev.raw_content, &canonical, now)
                    }
                };

                // Signals land before the snapshot advances: a failed write leaves
                // the old baseline in place so the next run re-derives the change.
                let errors_before = report.errors.len();
                self.write_all(entity, candidate.into_iter().collect(), now, report)
                    .await;
                if report.errors.len() > errors_before {
                    tracing::warn!(entity = %entity.slug, %kind, "signal write failed; snapshot not advanced");
                    return Ok(());
                }

                let appended = self
                    .snapshots
                    .append_snapshot(entity.id, kind, &print, &canonical, previous_id)
                    .await?;
                if appended.is_none() {
                    tracing::debug!(entity = %entity.slug, %kind, "snapshot advanced concurrently");
                }
                return Ok(());
            }
        };

        let _guard = self.locks.acquire(entity.id, kind).await;
        self.write_all(entity, candidates, now, report).await;
        Ok(())
    }

    async fn write_all(
        &self,
        entity: &Entity,
        candidates: Vec<SignalCandidate>,
        now: DateTime<Utc>,
        report: &mut UnitReport,
    ) {
        for candidate in candidates {
            match self.write_signal(entity, candidate, now).await {
                Ok(WriteOutcome::Written(_)) => report.new_signal_count += 1,
                Ok(WriteOutcome::Duplicate(_) | WriteOutcome::BelowThreshold(_)) => {}
                Err(e) => {
                    tracing::warn!(entity = %entity.slug, kind = %report.kind, error = %e, "signal write failed");
                    report.errors.push(e.to_string());
                }
            }
        }
    }
}

/// Fan `entities × kinds` out over at most `max_concurrent` units in flight.
pub async fn collect_all(
    pipeline: &Pipeline,
    entities: &[Entity],
    kinds: &[SourceKind],
    max_concurrent: usize,
) -> CollectRunSummary {
    let units: Vec<(&Entity, SourceKind)> = entities
        .iter()
        .flat_map(|entity| kinds.iter().map(move |kind| (entity, *kind)))
        .collect();

    let futures: Vec<BoxFuture<'_, UnitReport>> = units
        .into_iter()
        .map(|(entity, kind)| pipeline.collect_for_entity(entity, kind).boxed())
        .collect();

    let reports: Vec<UnitReport> = stream::iter(futures)
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let summary = CollectRunSummary::from_reports(reports);
    if summary.failed() > 0 {
        tracing::warn!(
            failed_units = summary.failed(),
            total_units = summary.units,
            "some units failed during collection"
        );
    }
    tracing::info!(
        units = summary.units,
        new_signals = summary.new_signals,
        skipped = summary.skipped.len(),
        "collection finished"
    );
    summary
}
