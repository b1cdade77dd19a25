//! Social profile collector (snapshot, follower count).

use std::sync::LazyLock;

use cwatch_core::{SignalCandidate, SignalCategory};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::Context;
use crate::canonical::canonicalize_html;
use crate::change::{describe_changes, percent_growth};

const PROFILE_BASE: &str = "https://www.linkedin.com/company/";
const FOLLOWER_GROWTH_PCT: f64 = 25.0;

static FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)\s*([km])?\s+followers\b")
        .expect("valid followers regex")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ProfileMetrics {
    pub followers: f64,
}

/// Full URLs are used as given; bare handles resolve to a company profile.
pub(crate) fn profile_url(handle: &str) -> String {
    let handle = handle.trim();
    if handle.starts_with("http://") || handle.starts_with("https://") {
        return handle.to_string();
    }
    format!("{PROFILE_BASE}{}", handle.trim_start_matches('@'))
}

pub(crate) fn extract_followers(raw: &str) -> Option<f64> {
    let text = canonicalize_html(raw);
    let cap = FOLLOWERS_RE.captures(&text)?;
    let base: f64 = cap[1].replace(',', "").parse().ok()?;
    let multiplier = match cap.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(ref suffix) if suffix == "k" => 1_000.0,
        Some(ref suffix) if suffix == "m" => 1_000_000.0,
        _ => 1.0,
    };
    Some((base * multiplier).round())
}

pub(crate) fn canonicalize(raw: &str) -> Option<String> {
    let followers = extract_followers(raw)?;
    serde_json::to_string(&ProfileMetrics { followers }).ok()
}

pub(crate) fn diff(ctx: &Context<'_>, old: &str, new: &str) -> Option<SignalCandidate> {
    let old: ProfileMetrics = serde_json::from_str(old).ok()?;
    let new: ProfileMetrics = serde_json::from_str(new).ok()?;
    let change = percent_growth("followers", old.followers, new.followers, FOLLOWER_GROWTH_PCT)?;
    let description = describe_changes(std::slice::from_ref(&change));

    Some(SignalCandidate {
        category: SignalCategory::Social,
        title: format!("{} audience growth: {description}", ctx.entity.name),
        summary: format!(
            "{} social following grew sharply: {description}.",
            ctx.entity.name
        ),
        content: format!("social audience growth {description}"),
        source_url: None,
        dedup_key: None,
        raw_payload: json!({
            "page_url": ctx.endpoint,
            "change": change,
        }),
        detected_at: ctx.now,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::collector::test_entity;

    #[test]
    fn handles_resolve_to_profile_urls() {
        assert_eq!(
            profile_url("@deskharbor"),
            "https://www.linkedin.com/company/deskharbor"
        );
        assert_eq!(
            profile_url("https://social.example/deskharbor"),
            "https://social.example/deskharbor"
        );
    }

    #[test]
    fn follower_counts_with_suffixes() {
        assert_eq!(extract_followers("<span>12,400 followers</span>"), Some(12_400.0));
        assert_eq!(extract_followers("<span>3.2K followers</span>"), Some(3_200.0));
        assert_eq!(extract_followers("<p>1.5M followers</p>"), Some(1_500_000.0));
        assert_eq!(extract_followers("<p>Follow us</p>"), None);
    }

    #[test]
    fn growth_threshold_is_inclusive() {
        let entity = test_entity();
        let ctx = Context {
            entity: &entity,
            endpoint: "https://www.linkedin.com/company/deskharbor",
            now: Utc::now(),
        };
        let old = canonicalize("<p>4,000 followers</p>").unwrap();
        let grown = canonicalize("<p>5,000 followers</p>").unwrap();
        let short = canonicalize("<p>4,900 followers</p>").unwrap();

        let candidate = diff(&ctx, &old, &grown).unwrap();
        assert_eq!(candidate.category, SignalCategory::Social);
        assert!(candidate.summary.contains("4000 -> 5000"));
        assert!(diff(&ctx, &old, &short).is_none());
        assert!(diff(&ctx, &grown, &old).is_none(), "shrinking is not growth");
    }
}
