use chrono::{DateTime, Utc};
use cwatch_core::SignalCategory;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Priority band derived from a momentum score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// `>= 75` critical, `>= 55` high, `>= 35` medium, else low.
    #[must_use]
    pub fn from_momentum(momentum: u8) -> Self {
        match momentum {
            75.. => Priority::Critical,
            55..=74 => Priority::High,
            35..=54 => Priority::Medium,
            _ => Priority::Low,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One supporting signal shown with a pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evidence {
    pub signal_id: Uuid,
    pub entity_name: String,
    pub title: String,
    pub summary: String,
    pub relevance_score: u8,
    pub source_url: Option<String>,
    pub detected_at: DateTime<Utc>,
}

/// Convergent activity in one category across several entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    pub category: SignalCategory,
    /// Contributing entity names, sorted.
    pub entities: Vec<String>,
    pub competitor_count: usize,
    pub total_signals: usize,
    /// Mean relevance, rounded to one decimal.
    pub avg_relevance: f64,
    pub momentum: u8,
    pub priority: Priority,
    pub evidence: Vec<Evidence>,
    pub latest_signal_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub category: SignalCategory,
    pub priority: Priority,
    /// The pattern's momentum, verbatim.
    pub confidence: u8,
    pub action: String,
    pub rationale: String,
    pub owner: String,
    pub time_horizon: String,
}

/// Portfolio view returned by one aggregation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternInsights {
    pub strategic_pressure_index: u8,
    pub market_heat: u8,
    pub parallel_moves: usize,
    pub total_signals: usize,
    pub strategic_signals: usize,
    pub strategic_ratio: f64,
    pub avg_strategic_relevance: f64,
    pub patterns: Vec<Pattern>,
    pub recommendations: Vec<Recommendation>,
    pub generated_at: DateTime<Utc>,
}

impl PatternInsights {
    /// Zeroed indices and empty lists.
    #[must_use]
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            strategic_pressure_index: 0,
            market_heat: 0,
            parallel_moves: 0,
            total_signals: 0,
            strategic_signals: 0,
            strategic_ratio: 0.0,
            avg_strategic_relevance: 0.0,
            patterns: Vec::new(),
            recommendations: Vec::new(),
            generated_at,
        }
    }
}
