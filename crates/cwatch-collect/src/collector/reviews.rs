//! Employer-review collector (snapshot with baseline, numeric).
//!
//! Review pages usually embed an `AggregateRating` JSON-LD block; the
//! recommend percentage only appears in visible text.

use std::sync::LazyLock;

use cwatch_core::{SignalCandidate, SignalCategory};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Context;
use crate::canonical::canonicalize_html;
use crate::change::{absolute_change, describe_changes, format_number, format_rating, percent_growth};

const RATING_DELTA: f64 = 0.3;
const REVIEW_GROWTH_PCT: f64 = 15.0;
const RECOMMEND_POINTS: f64 = 10.0;

static JSON_LD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid json-ld regex")
});

static RATING_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([0-5](?:\.\d{1,2})?)\s*(?:out of 5|/\s*5)\b").expect("valid rating regex")
});

static REVIEW_COUNT_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:,\d{3})+|\d+)\s+reviews?\b").expect("valid review count regex")
});

static RECOMMEND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})\s*%\s*(?:would\s+)?recommend").expect("valid recommend regex")
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ReviewMetrics {
    pub rating: Option<f64>,
    pub review_count: Option<f64>,
    pub recommend_pct: Option<f64>,
}

impl ReviewMetrics {
    fn is_empty(&self) -> bool {
        self.rating.is_none() && self.review_count.is_none() && self.recommend_pct.is_none()
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(rating) = self.rating {
            parts.push(format!("rating {}", format_rating(rating)));
        }
        if let Some(count) = self.review_count {
            parts.push(format!("{} reviews", format_number(count)));
        }
        if let Some(pct) = self.recommend_pct {
            parts.push(format!("{}% recommend", format_number(pct)));
        }
        parts.join(", ")
    }

    /// Stable identity for one observed state.
    fn key(&self) -> String {
        let render = |v: Option<f64>| v.map_or_else(|| "-".to_string(), format_number);
        format!(
            "{}|{}|{}",
            render(self.rating),
            render(self.review_count),
            render(self.recommend_pct)
        )
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    }
}

fn find_aggregate_rating(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            if let Some(rating) = map.get("aggregateRating") {
                return Some(rating);
            }
            if map.get("@type").and_then(Value::as_str) == Some("AggregateRating") {
                return Some(value);
            }
            map.values().find_map(find_aggregate_rating)
        }
        Value::Array(items) => items.iter().find_map(find_aggregate_rating),
        _ => None,
    }
}

pub(crate) fn extract(raw: &str) -> ReviewMetrics {
    let mut metrics = ReviewMetrics::default();

    for cap in JSON_LD_RE.captures_iter(raw) {
        let Ok(value) = serde_json::from_str::<Value>(cap[1].trim()) else {
            continue;
        };
        if let Some(aggregate) = find_aggregate_rating(&value) {
            metrics.rating = aggregate.get("ratingValue").and_then(number);
            metrics.review_count = aggregate
                .get("reviewCount")
                .or_else(|| aggregate.get("ratingCount"))
                .and_then(number);
            break;
        }
    }

    let text = canonicalize_html(raw);
    if metrics.rating.is_none() {
        metrics.rating = RATING_TEXT_RE
            .captures(&text)
            .and_then(|c| c[1].parse().ok());
    }
    if metrics.review_count.is_none() {
        metrics.review_count = REVIEW_COUNT_TEXT_RE
            .captures(&text)
            .and_then(|c| c[1].replace(',', "").parse().ok());
    }
    metrics.recommend_pct = RECOMMEND_RE
        .captures(&text)
        .and_then(|c| c[1].parse::<f64>().ok())
        .filter(|pct| *pct <= 100.0);
    metrics
}

pub(crate) fn canonicalize(raw: &str) -> Option<String> {
    let metrics = extract(raw);
    if metrics.is_empty() {
        return None;
    }
    serde_json::to_string(&metrics).ok()
}

pub(crate) fn baseline(ctx: &Context<'_>, canonical: &str) -> Option<SignalCandidate> {
    let metrics: ReviewMetrics = serde_json::from_str(canonical).ok()?;
    if metrics.is_empty() {
        return None;
    }
    let description = metrics.describe();
    Some(SignalCandidate {
        category: SignalCategory::Reputation,
        title: format!("{} employer reviews baseline: {description}", ctx.entity.name),
        summary: format!(
            "First employer-review capture for {}: {description}.",
            ctx.entity.name
        ),
        content: format!("employee reviews {description}"),
        source_url: None,
        dedup_key: Some(format!("{}|{}", ctx.endpoint, metrics.key())),
        raw_payload: json!({
            "page_url": ctx.endpoint,
            "baseline": true,
            "metrics": metrics,
        }),
        detected_at: ctx.now,
    })
}

pub(crate) fn diff(ctx: &Context<'_>, old: &str, new: &str) -> Option<SignalCandidate> {
    let old: ReviewMetrics = serde_json::from_str(old).ok()?;
    let new: ReviewMetrics = serde_json::from_str(new).ok()?;

    let mut changes = Vec::new();
    if let (Some(o), Some(n)) = (old.rating, new.rating) {
        changes.extend(absolute_change("rating", o, n, RATING_DELTA));
    }
    if let (Some(o), Some(n)) = (old.review_count, new.review_count) {
        changes.extend(percent_growth("reviews", o, n, REVIEW_GROWTH_PCT));
    }
    if let (Some(o), Some(n)) = (old.recommend_pct, new.recommend_pct) {
        changes.extend(absolute_change("recommend_pct", o, n, RECOMMEND_POINTS));
    }
    if changes.is_empty() {
        return None;
    }

    let description = describe_changes(&changes);
    Some(SignalCandidate {
        category: SignalCategory::Reputation,
        title: format!("{} employer reviews: {description}", ctx.entity.name),
        summary: format!("Employer reviews for {} changed: {description}.", ctx.entity.name),
        content: format!("employee reviews changed {description}"),
        source_url: None,
        dedup_key: Some(format!("{}|{}", ctx.endpoint, new.key())),
        raw_payload: json!({
            "page_url": ctx.endpoint,
            "changes": changes,
            "before": old,
            "after": new,
        }),
        detected_at: ctx.now,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::collector::test_entity;

    fn page(rating: &str, count: u32, recommend: u32) -> String {
        format!(
            r#"<html><head><script type="application/ld+json">
            {{"@context":"https://schema.org","@type":"Organization","name":"Desk Harbor",
              "aggregateRating":{{"@type":"AggregateRating","ratingValue":"{rating}","reviewCount":{count}}}}}
            </script></head><body><p>{recommend}% would recommend to a friend</p></body></html>"#
        )
    }

    #[test]
    fn extracts_json_ld_and_recommend_text() {
        let metrics = extract(&page("4.1", 230, 72));
        assert_eq!(metrics.rating, Some(4.1));
        assert_eq!(metrics.review_count, Some(230.0));
        assert_eq!(metrics.recommend_pct, Some(72.0));
    }

    #[test]
    fn falls_back_to_visible_text() {
        let html = "<div>Rated 3.8 out of 5 based on 1,204 reviews</div>";
        let metrics = extract(html);
        assert_eq!(metrics.rating, Some(3.8));
        assert_eq!(metrics.review_count, Some(1204.0));
        assert_eq!(metrics.recommend_pct, None);
    }

    #[test]
    fn unrecognizable_page_has_no_canonical_form() {
        assert!(canonicalize("<html><body>Sign in to continue</body></html>").is_none());
    }

    #[test]
    fn baseline_describes_first_capture() {
        let entity = test_entity();
        let ctx = Context {
            entity: &entity,
            endpoint: "https://reviews.example/deskharbor",
            now: Utc::now(),
        };
        let canonical = canonicalize(&page("4.0", 200, 70)).unwrap();
        let candidate = baseline(&ctx, &canonical).unwrap();
        assert_eq!(candidate.category, SignalCategory::Reputation);
        assert!(candidate.summary.contains("rating 4.0, 200 reviews"), "{}", candidate.summary);
        assert!(candidate.summary.contains("200 reviews"));
        assert!(candidate.source_url.is_none());
    }

    #[test]
    fn rating_change_mentions_both_values() {
        let entity = test_entity();
        let ctx = Context {
            entity: &entity,
            endpoint: "https://reviews.example/deskharbor",
            now: Utc::now(),
        };
        let old = canonicalize(&page("4.0", 200, 70)).unwrap();
        let new = canonicalize(&page("4.3", 205, 72)).unwrap();
        let candidate = diff(&ctx, &old, &new).unwrap();
        assert!(candidate.summary.contains("rating 4.0 -> 4.3"), "{}", candidate.summary);
        assert!(!candidate.summary.contains("reviews 200"));

        let baseline_key = baseline(&ctx, &old).unwrap().dedup_key;
        assert_ne!(candidate.dedup_key, baseline_key);
    }

    #[test]
    fn small_moves_are_ignored() {
        let entity = test_entity();
        let ctx = Context {
            entity: &entity,
            endpoint: "",
            now: Utc::now(),
        };
        let old = canonicalize(&page("4.0", 200, 70)).unwrap();
        let new = canonicalize(&page("4.2", 220, 79)).unwrap();
        assert!(diff(&ctx, &old, &new).is_none());
    }
}
