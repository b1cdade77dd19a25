//! App-store listing collector (snapshot, numeric + version).

use cwatch_core::{SignalCandidate, SignalCategory};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Context;
use crate::change::{absolute_change, describe_changes, percent_growth};

const LOOKUP_URL: &str = "https://itunes.apple.com/lookup";
const RATING_DELTA: f64 = 0.3;
const RATING_COUNT_GROWTH_PCT: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ListingMetrics {
    pub name: Option<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<f64>,
    pub version: Option<String>,
}

pub(crate) fn lookup_url(app_id: &str) -> String {
    let encoded = utf8_percent_encode(app_id, NON_ALPHANUMERIC);
    format!("{LOOKUP_URL}?id={encoded}")
}

pub(crate) fn canonicalize(raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let app = value.pointer("/results/0")?;
    let metrics = ListingMetrics {
        name: app.get("trackName").and_then(Value::as_str).map(str::to_string),
        rating: app
            .get("averageUserRating")
            .and_then(Value::as_f64)
            .map(|r| (r * 100.0).round() / 100.0),
        rating_count: app.get("userRatingCount").and_then(Value::as_f64),
        version: app.get("version").and_then(Value::as_str).map(str::to_string),
    };
    if metrics.rating.is_none() && metrics.rating_count.is_none() && metrics.version.is_none() {
        return None;
    }
    serde_json::to_string(&metrics).ok()
}

pub(crate) fn diff(ctx: &Context<'_>, old: &str, new: &str) -> Option<SignalCandidate> {
    let old: ListingMetrics = serde_json::from_str(old).ok()?;
    let new: ListingMetrics = serde_json::from_str(new).ok()?;

    let mut changes = Vec::new();
    if let (Some(o), Some(n)) = (old.rating, new.rating) {
        changes.extend(absolute_change("rating", o, n, RATING_DELTA));
    }
    if let (Some(o), Some(n)) = (old.rating_count, new.rating_count) {
        changes.extend(percent_growth("ratings", o, n, RATING_COUNT_GROWTH_PCT));
    }
    let version_change = match (&old.version, &new.version) {
        (Some(o), Some(n)) if o != n => Some(format!("version {o} -> {n}")),
        _ => None,
    };
    if changes.is_empty() && version_change.is_none() {
        return None;
    }

    let description = [Some(describe_changes(&changes)), version_change.clone()]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    let app_name = new.name.as_deref().unwrap_or("app");
    let content = if version_change.is_some() {
        format!("new release of {app_name}: {description}")
    } else {
        format!("{app_name} listing: {description}")
    };

    Some(SignalCandidate {
        category: SignalCategory::Product,
        title: format!("{} app listing: {description}", ctx.entity.name),
        summary: format!("{} ({app_name}) app listing changed: {description}.", ctx.entity.name),
        content,
        source_url: None,
        dedup_key: None,
        raw_payload: json!({
            "lookup_url": ctx.endpoint,
            "changes": changes,
            "old_version": old.version,
            "new_version": new.version,
        }),
        detected_at: ctx.now,
    })
}
