//! Change detection primitives shared by every snapshot-based collector.
//!
//! Text sources diff as line sets. Numeric sources compare named dimensions
//! against thresholds; only dimensions that meet their threshold count.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

/// Tolerance for float threshold comparisons, so 4.0 -> 4.3 meets a 0.3 rule.
const EPSILON: f64 = 1e-9;

/// Line-level set difference between two canonical texts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl TextDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Lines present in `new` but not `old` (added) and vice versa (removed),
/// each in order of first appearance without repeats.
#[must_use]
pub fn diff_lines(old: &str, new: &str) -> TextDiff {
    let old_set: HashSet<&str> = old.lines().collect();
    let new_set: HashSet<&str> = new.lines().collect();
    TextDiff {
        added: ordered_difference(new, &old_set),
        removed: ordered_difference(old, &new_set),
    }
}

fn ordered_difference(text: &str, exclude: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .filter(|line| !line.trim().is_empty() && !exclude.contains(line) && seen.insert(*line))
        .map(str::to_string)
        .collect()
}

/// A numeric dimension whose movement met its threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricChange {
    pub dimension: &'static str,
    pub old: f64,
    pub new: f64,
    /// Signed absolute delta (`new - old`).
    pub delta: f64,
    /// Signed percentage change relative to `old`, when `old` is non-zero.
    pub pct: Option<f64>,
}

impl MetricChange {
    fn render(&self, value: f64) -> String {
        if self.dimension == "rating" {
            format_rating(value)
        } else {
            format_number(value)
        }
    }
}

impl fmt::Display for MetricChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.delta >= 0.0 { "up" } else { "down" };
        write!(
            f,
            "{} {} -> {} ({direction} {})",
            self.dimension,
            self.render(self.old),
            self.render(self.new),
            self.pct.map_or_else(
                || format_number(self.delta.abs()),
                |p| format!("{:.1}%", p.abs())
            )
        )
    }
}

/// Reports `dimension` as changed when `|new - old| >= threshold`.
#[must_use]
pub fn absolute_change(
    dimension: &'static str,
    old: f64,
    new: f64,
    threshold: f64,
) -> Option<MetricChange> {
    let delta = new - old;
    (delta.abs() + EPSILON >= threshold).then(|| MetricChange {
        dimension,
        old,
        new,
        delta,
        pct: None,
    })
}

/// Reports `dimension` as changed when it grew by at least `threshold_pct` percent.
///
/// Growth from zero is not a percentage and is never reported.
#[must_use]
pub fn percent_growth(
    dimension: &'static str,
    old: f64,
    new: f64,
    threshold_pct: f64,
) -> Option<MetricChange> {
    let pct = percent_change(old, new)?;
    (pct + EPSILON >= threshold_pct).then(|| MetricChange {
        dimension,
        old,
        new,
        delta: new - old,
        pct: Some(pct),
    })
}

/// Signed percentage change from `old` to `new`; `None` when `old` is not positive.
#[must_use]
pub fn percent_change(old: f64, new: f64) -> Option<f64> {
    (old > 0.0).then(|| (new - old) * 100.0 / old)
}

/// Severity of a price move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    /// >= 5 %
    Flag,
    /// >= 10 %
    Notable,
    /// >= 20 %
    Major,
}

impl PriceTier {
    /// Classify an absolute percentage move; `None` below 5 %.
    #[must_use]
    pub fn classify(pct: f64) -> Option<Self> {
        let pct = pct.abs() + EPSILON;
        if pct >= 20.0 {
            Some(PriceTier::Major)
        } else if pct >= 10.0 {
            Some(PriceTier::Notable)
        } else if pct >= 5.0 {
            Some(PriceTier::Flag)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PriceTier::Flag => "flag",
            PriceTier::Notable => "notable",
            PriceTier::Major => "major",
        }
    }
}

/// Join changed dimensions into one description; multiple changes never
/// split into multiple signals.
#[must_use]
pub fn describe_changes(changes: &[MetricChange]) -> String {
    changes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Render a metric without trailing zeros: `4.3`, `1200`, `4.25`.
#[must_use]
pub fn format_number(value: f64) -> String {
    let rendered = format!("{value:.2}");
    rendered
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Render a star rating with at least one decimal: `4.0`, `4.3`, `4.25`.
#[must_use]
pub fn format_rating(value: f64) -> String {
    let rendered = format_number(value);
    if rendered.contains('.') {
        rendered
    } else {
        format!("{value:.1}")
    }
}
