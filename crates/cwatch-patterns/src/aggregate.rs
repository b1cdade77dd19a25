//! Pattern aggregation over a trailing signal window.
//!
//! Momentum per pattern (0-100):
//!
//! | component | formula |
//! |---|---|
//! | coverage  | `min(40, entities * 12)` |
//! | volume    | `min(25, signals * 3)` |
//! | intensity | `min(20, avg_relevance * 2)` |
//! | recency   | 15 (<= 2 days), 10 (<= 7), 5 (<= 14), else 2 |
//!
//! Strategic pressure index:
//! `min(100, round(avg_strategic_relevance * 7 + strategic_ratio * 30 + min(patterns, 4) * 8))`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use cwatch_core::{FilterConfig, Signal, SignalCategory};

use crate::recommend::recommend;
use crate::types::{Evidence, Pattern, PatternInsights, Priority};

const MIN_PATTERN_ENTITIES: usize = 2;
const MIN_PATTERN_SIGNALS: usize = 3;
const EVIDENCE_LIMIT: usize = 4;
/// Entities with at least this many strategic signals count as "hot".
const HOT_ENTITY_SIGNALS: usize = 3;

#[derive(Debug, Clone)]
pub struct AggregationSettings {
    pub window: Duration,
    pub filters: FilterConfig,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            window: Duration::days(30),
            filters: FilterConfig::default(),
        }
    }
}

/// Whether a signal counts toward strategic activity.
///
/// Requires `is_relevant`. Hiring signals for denylisted frontline roles are
/// excluded unless scored at or above the configured override. The role is
/// read from `raw_payload.job_title` so locations and entity names in the
/// title cannot trip the denylist; older rows without it fall back to the title.
#[must_use]
pub fn is_strategic(signal: &Signal, filters: &FilterConfig) -> bool {
    if !signal.is_relevant {
        return false;
    }
    if signal.category != SignalCategory::Hiring {
        return true;
    }
    let role = signal
        .raw_payload
        .get("job_title")
        .and_then(|v| v.as_str())
        .unwrap_or(&signal.title);
    signal.relevance_score >= filters.hiring_override_score
        || filters.denylisted_role(role).is_none()
}

/// Aggregate `signals` into patterns, portfolio indices and recommendations.
///
/// Signals detected before `now - settings.window` are ignored. Entity names
/// come from `entity_names`; unknown ids render as `entity #<id>`.
#[must_use]
pub fn compute_insights(
    signals: &[Signal],
    entity_names: &HashMap<i64, String>,
    settings: &AggregationSettings,
    now: DateTime<Utc>,
) -> PatternInsights {
    let window_start = now - settings.window;
    let in_window: Vec<&Signal> = signals
        .iter()
        .filter(|s| s.detected_at >= window_start)
        .collect();
    if in_window.is_empty() {
        return PatternInsights::empty(now);
    }

    let strategic: Vec<&Signal> = in_window
        .iter()
        .copied()
        .filter(|s| is_strategic(s, &settings.filters))
        .collect();

    let name_of = |id: i64| {
        entity_names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("entity #{id}"))
    };

    let mut groups: BTreeMap<SignalCategory, Vec<&Signal>> = BTreeMap::new();
    for signal in &strategic {
        groups.entry(signal.category).or_default().push(signal);
    }

    let mut patterns: Vec<Pattern> = groups
        .into_iter()
        .filter_map(|(category, members)| build_pattern(category, &members, &name_of, now))
        .collect();
    patterns.sort_by(|a, b| {
        b.momentum
            .cmp(&a.momentum)
            .then(b.total_signals.cmp(&a.total_signals))
            .then(a.category.cmp(&b.category))
    });

    let strategic_ratio = ratio(strategic.len(), in_window.len());
    let avg_strategic_relevance = mean_score(&strategic);
    let strategic_pressure_index = clamp_score(
        avg_strategic_relevance * 7.0
            + strategic_ratio * 30.0
            + as_f64(patterns.len().min(4)) * 8.0,
    );

    let observed: BTreeSet<i64> = in_window.iter().map(|s| s.entity_id).collect();
    let mut strategic_per_entity: HashMap<i64, usize> = HashMap::new();
    for signal in &strategic {
        *strategic_per_entity.entry(signal.entity_id).or_default() += 1;
    }
    let hot = strategic_per_entity
        .values()
        .filter(|count| **count >= HOT_ENTITY_SIGNALS)
        .count();
    let market_heat = clamp_score(100.0 * ratio(hot, observed.len()));

    let recommendations = recommend(&patterns);

    PatternInsights {
        strategic_pressure_index,
        market_heat,
        parallel_moves: patterns.len(),
        total_signals: in_window.len(),
        strategic_signals: strategic.len(),
        strategic_ratio: round_to(strategic_ratio, 3),
        avg_strategic_relevance: round_to(avg_strategic_relevance, 2),
        patterns,
        recommendations,
        generated_at: now,
    }
}

fn build_pattern(
    category: SignalCategory,
    members: &[&Signal],
    name_of: &impl Fn(i64) -> String,
    now: DateTime<Utc>,
) -> Option<Pattern> {
    let entity_ids: BTreeSet<i64> = members.iter().map(|s| s.entity_id).collect();
    if entity_ids.len() < MIN_PATTERN_ENTITIES || members.len() < MIN_PATTERN_SIGNALS {
        return None;
    }

    let latest_signal_at = members.iter().map(|s| s.detected_at).max()?;
    let avg_relevance = mean_score(members);
    let momentum = momentum(entity_ids.len(), members.len(), avg_relevance, now - latest_signal_at);

    let mut ranked = members.to_vec();
    ranked.sort_by(|a, b| {
        b.relevance_score
            .cmp(&a.relevance_score)
            .then(b.detected_at.cmp(&a.detected_at))
    });
    let evidence = ranked
        .into_iter()
        .take(EVIDENCE_LIMIT)
        .map(|s| Evidence {
            signal_id: s.public_id,
            entity_name: name_of(s.entity_id),
            title: s.title.clone(),
            summary: s.summary.clone(),
            relevance_score: s.relevance_score,
            source_url: s.source_url.clone(),
            detected_at: s.detected_at,
        })
        .collect();

    let mut entities: Vec<String> = entity_ids.iter().map(|id| name_of(*id)).collect();
    entities.sort();

    Some(Pattern {
        category,
        competitor_count: entity_ids.len(),
        entities,
        total_signals: members.len(),
        avg_relevance: round_to(avg_relevance, 1),
        momentum,
        priority: Priority::from_momentum(momentum),
        evidence,
        latest_signal_at,
    })
}

/// Composite 0-100 momentum; see the module table.
#[must_use]
pub(crate) fn momentum(
    entity_count: usize,
    signal_count: usize,
    avg_relevance: f64,
    newest_age: Duration,
) -> u8 {
    let coverage = as_f64(entity_count.saturating_mul(12)).min(40.0);
    let volume = as_f64(signal_count.saturating_mul(3)).min(25.0);
    let intensity = (avg_relevance * 2.0).min(20.0);
    clamp_score(coverage + volume + intensity + recency_bonus(newest_age))
}

pub(crate) fn recency_bonus(age: Duration) -> f64 {
    if age <= Duration::days(2) {
        15.0
    } else if age <= Duration::days(7) {
        10.0
    } else if age <= Duration::days(14) {
        5.0
    } else {
        2.0
    }
}

fn mean_score(signals: &[&Signal]) -> f64 {
    if signals.is_empty() {
        return 0.0;
    }
    let total: u32 = signals.iter().map(|s| u32::from(s.relevance_score)).sum();
    f64::from(total) / as_f64(signals.len())
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        as_f64(part) / as_f64(whole)
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(n: usize) -> f64 {
    n as f64
}

/// Round and clamp into `0..=100`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
