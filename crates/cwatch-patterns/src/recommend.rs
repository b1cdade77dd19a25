//! Table-driven recommendations for the top patterns.

use cwatch_core::SignalCategory;

use crate::types::{Pattern, Priority, Recommendation};

pub const MAX_RECOMMENDATIONS: usize = 5;

/// Response to convergent activity in one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playbook {
    pub action: &'static str,
    pub owner: &'static str,
}

#[must_use]
pub fn playbook(category: SignalCategory) -> Playbook {
    let (action, owner) = match category {
        SignalCategory::Hiring => ("Accelerate talent defense", "People+Operations"),
        SignalCategory::Pricing => ("Run pricing war-game", "Revenue+RealEstate"),
        SignalCategory::Product => ("Review product roadmap gaps", "Product"),
        SignalCategory::Funding => ("Reassess competitor runway and war chest", "Finance+Strategy"),
        SignalCategory::Leadership => ("Map new leadership priorities", "Strategy"),
        SignalCategory::Expansion => ("Defend priority markets", "Growth+RealEstate"),
        SignalCategory::Partnership => ("Audit channel and partner exposure", "Partnerships"),
        SignalCategory::Regulatory => ("Review regulatory disclosures", "Legal+Finance"),
        SignalCategory::Reputation => ("Target dissatisfied talent and customers", "People+Marketing"),
        SignalCategory::Social => ("Counter-position brand messaging", "Marketing"),
        SignalCategory::Webpage => ("Compare positioning and offers", "Marketing+Product"),
        SignalCategory::News => ("Brief leadership on competitor narrative", "Strategy+Communications"),
    };
    Playbook { action, owner }
}

fn time_horizon(priority: Priority) -> &'static str {
    match priority {
        Priority::Critical => "0–14 days",
        Priority::High => "this quarter",
        Priority::Medium | Priority::Low => "monitor this cycle",
    }
}

/// One recommendation per pattern, for the top [`MAX_RECOMMENDATIONS`] by momentum.
///
/// `patterns` need not be pre-sorted.
#[must_use]
pub fn recommend(patterns: &[Pattern]) -> Vec<Recommendation> {
    let mut ranked: Vec<&Pattern> = patterns.iter().collect();
    ranked.sort_by(|a, b| b.momentum.cmp(&a.momentum));
    ranked
        .into_iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|pattern| {
            let playbook = playbook(pattern.category);
            Recommendation {
                category: pattern.category,
                priority: pattern.priority,
                confidence: pattern.momentum,
                action: playbook.action.to_string(),
                rationale: rationale(pattern),
                owner: playbook.owner.to_string(),
                time_horizon: time_horizon(pattern.priority).to_string(),
            }
        })
        .collect()
}

fn rationale(pattern: &Pattern) -> String {
    let mut text = format!(
        "{} competitors ({}) produced {} {} signals (avg relevance {:.1}).",
        pattern.competitor_count,
        pattern.entities.join(", "),
        pattern.total_signals,
        pattern.category,
        pattern.avg_relevance
    );
    if let Some(top) = pattern.evidence.first() {
        text.push_str(&format!(" Strongest: {}: {}.", top.entity_name, top.title));
    }
    text
}
