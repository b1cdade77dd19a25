//! Relevance scoring strategies behind one interface.
//!
//! Scorers are total: any well-typed input yields a [`Relevance`], never an
//! error. The strategy is injected into the pipeline, so tests can swap in a
//! deterministic fake.

mod heuristic;
mod semantic;

use std::sync::Arc;

use async_trait::async_trait;
use cwatch_core::{AppConfig, FilterConfig, SignalCategory, RELEVANCE_THRESHOLD};
use serde::Serialize;

use crate::error::CollectError;

pub use heuristic::HeuristicScorer;
pub use semantic::{parse_classifier_output, SemanticScorer, SemanticScorerConfig};

/// Score used when a classifier answer cannot be obtained or parsed.
pub const NEUTRAL_SCORE: u8 = 5;

const SUMMARY_MAX_CHARS: usize = 280;

/// Uniform scorer output. `is_relevant` always equals `score >= 5`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relevance {
    pub score: u8,
    pub summary: String,
    pub is_relevant: bool,
}

impl Relevance {
    /// Build a result, clamping `score` into `1..=10`.
    #[must_use]
    pub fn new(score: i64, summary: impl Into<String>) -> Self {
        let score = u8::try_from(score.clamp(1, 10)).unwrap_or(NEUTRAL_SCORE);
        Self {
            score,
            summary: summary.into(),
            is_relevant: score >= RELEVANCE_THRESHOLD,
        }
    }

    #[must_use]
    pub fn neutral(summary: impl Into<String>) -> Self {
        Self::new(i64::from(NEUTRAL_SCORE), summary)
    }
}

#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    async fn score(
        &self,
        category: SignalCategory,
        title: &str,
        content: &str,
        entity_name: &str,
    ) -> Relevance;
}

/// Pick the semantic scorer when a classifier is configured, else the heuristic one.
///
/// # Errors
///
/// Returns [`CollectError::Http`] if the classifier HTTP client cannot be built.
pub fn build_scorer(
    config: &AppConfig,
    filters: &FilterConfig,
) -> Result<Arc<dyn RelevanceScorer>, CollectError> {
    if let Some(scorer_config) = SemanticScorerConfig::from_app_config(config) {
        tracing::info!(model = %scorer_config.model, "using semantic relevance scorer");
        return Ok(Arc::new(SemanticScorer::new(scorer_config)?));
    }
    tracing::info!("classifier not configured; using heuristic relevance scorer");
    Ok(Arc::new(HeuristicScorer::new(filters.keywords.clone())))
}

/// Short human-readable summary: the content, truncated, or the title when
/// there is no content.
pub(crate) fn summarize(title: &str, content: &str) -> String {
    let content = content.trim();
    if content.is_empty() {
        return title.trim().to_string();
    }
    if content.chars().count() <= SUMMARY_MAX_CHARS {
        return content.to_string();
    }
    let truncated: String = content.chars().take(SUMMARY_MAX_CHARS).collect();
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevance_clamps_and_derives_flag() {
        let high = Relevance::new(42, "x");
        assert_eq!(high.score, 10);
        assert!(high.is_relevant);

        let low = Relevance::new(-3, "x");
        assert_eq!(low.score, 1);
        assert!(!low.is_relevant);

        assert!(Relevance::new(5, "x").is_relevant);
        assert!(!Relevance::new(4, "x").is_relevant);
    }

    #[test]
    fn neutral_is_five_and_relevant() {
        let neutral = Relevance::neutral("fallback");
        assert_eq!(neutral.score, NEUTRAL_SCORE);
        assert!(neutral.is_relevant);
        assert_eq!(neutral.summary, "fallback");
    }

    #[test]
    fn summarize_prefers_content_and_truncates() {
        assert_eq!(summarize("Title", "  "), "Title");
        assert_eq!(summarize("Title", "Body"), "Body");
        let long = "word ".repeat(100);
        let summary = summarize("Title", &long);
        assert!(summary.ends_with("..."));
        assert!(summary.chars().count() <= SUMMARY_MAX_CHARS + 3);
    }
}
