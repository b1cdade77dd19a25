use async_trait::async_trait;
use cwatch_core::filters::contains_keyword;
use cwatch_core::{KeywordTiers, SignalCategory};

use super::{summarize, Relevance, RelevanceScorer};

const CRITICAL_SCORE: u8 = 9;
const HIGH_SCORE: u8 = 7;
const MEDIUM_SCORE: u8 = 5;
const BASE_SCORE: u8 = 3;

/// Layered keyword scorer for high-volume ingestion.
///
/// Tiers are checked most severe first and the first match wins.
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    tiers: KeywordTiers,
}

impl HeuristicScorer {
    #[must_use]
    pub fn new(tiers: KeywordTiers) -> Self {
        Self { tiers }
    }

    /// Score free text against the keyword tiers.
    #[must_use]
    pub fn score_text(&self, text: &str) -> u8 {
        let lower = text.to_lowercase();
        let hit = |keywords: &[String]| keywords.iter().any(|kw| contains_keyword(&lower, kw));

        if hit(&self.tiers.critical) {
            CRITICAL_SCORE
        } else if hit(&self.tiers.high) {
            HIGH_SCORE
        } else if hit(&self.tiers.medium) {
            MEDIUM_SCORE
        } else {
            BASE_SCORE
        }
    }
}

#[async_trait]
impl RelevanceScorer for HeuristicScorer {
    async fn score(
        &self,
        _category: SignalCategory,
        title: &str,
        content: &str,
        _entity_name: &str,
    ) -> Relevance {
        let score = self.score_text(&format!("{title}\n{content}"));
        Relevance::new(i64::from(score), summarize(title, content))
    }
}
