//! Listings-page price collector (snapshot, numeric).

use std::sync::LazyLock;

use cwatch_core::{SignalCandidate, SignalCategory};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::Context;
use crate::canonical::canonicalize_html;
use crate::change::{format_number, percent_change, PriceTier};

const MAX_PRICES: usize = 200;

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[$€£]\s?(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)")
        .expect("valid price regex")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PriceSheet {
    pub prices: Vec<f64>,
    pub mean: f64,
}

pub(crate) fn extract_prices(html: &str) -> Vec<f64> {
    let text = canonicalize_html(html);
    let mut prices: Vec<f64> = PRICE_RE
        .captures_iter(&text)
        .filter_map(|cap| cap.get(1))
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .filter(|p| *p > 0.0)
        .take(MAX_PRICES)
        .collect();
    prices.sort_by(f64::total_cmp);
    prices
}

pub(crate) fn canonicalize(raw: &str) -> Option<String> {
    let prices = extract_prices(raw);
    if prices.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = prices.iter().sum::<f64>() / prices.len() as f64;
    let sheet = PriceSheet {
        prices,
        mean: (mean * 100.0).round() / 100.0,
    };
    serde_json::to_string(&sheet).ok()
}

pub(crate) fn diff(ctx: &Context<'_>, old: &str, new: &str) -> Option<SignalCandidate> {
    let old: PriceSheet = serde_json::from_str(old).ok()?;
    let new: PriceSheet = serde_json::from_str(new).ok()?;
    let pct = percent_change(old.mean, new.mean)?;
    let tier = PriceTier::classify(pct)?;
    let direction = if pct >= 0.0 { "up" } else { "down" };

    let summary = format!(
        "Average listed price moved {direction} {:.1}% from ${} to ${} across {} listings ({} move).",
        pct.abs(),
        format_number(old.mean),
        format_number(new.mean),
        new.prices.len(),
        tier.as_str()
    );
    Some(SignalCandidate {
        category: SignalCategory::Pricing,
        title: format!(
            "{} price {direction} {:.1}%: ${} -> ${}",
            ctx.entity.name,
            pct.abs(),
            format_number(old.mean),
            format_number(new.mean)
        ),
        content: format!("price change {direction} {}\n{summary}", tier.as_str()),
        summary,
        source_url: None,
        dedup_key: None,
        raw_payload: json!({
            "page_url": ctx.endpoint,
            "old_mean": old.mean,
            "new_mean": new.mean,
            "pct_change": pct,
            "tier": tier,
            "old_listings": old.prices.len(),
            "new_listings": new.prices.len(),
        }),
        detected_at: ctx.now,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::collector::test_entity;

    fn page(prices: &[&str]) -> String {
        let items: String = prices
            .iter()
            .map(|p| format!("<li class=\"plan\">Dedicated desk <span>{p}</span>/mo</li>"))
            .collect();
        format!("<html><body><ul>{items}</ul><footer>From $1</footer></body></html>")
    }

    #[test]
    fn extracts_prices_ignoring_footer() {
        let prices = extract_prices(&page(&["$1,200", "$350.50", "€99"]));
        assert_eq!(prices, vec![99.0, 350.5, 1200.0]);
    }

    #[test]
    fn page_without_prices_has_no_canonical_form() {
        assert!(canonicalize("<p>Call us for pricing</p>").is_none());
    }

    #[test]
    fn small_moves_are_ignored_and_tiers_reported() {
        let entity = test_entity();
        let ctx = Context {
            entity: &entity,
            endpoint: "https://deskharbor.example/locations",
            now: Utc::now(),
        };
        let base = canonicalize(&page(&["$100", "$300"])).unwrap();
        let small = canonicalize(&page(&["$104", "$300"])).unwrap();
        let big = canonicalize(&page(&["$150", "$330"])).unwrap();

        assert!(diff(&ctx, &base, &small).is_none());

        let candidate = diff(&ctx, &base, &big).unwrap();
        assert_eq!(candidate.category, SignalCategory::Pricing);
        assert_eq!(candidate.raw_payload["tier"], "major");
        assert!(candidate.title.contains("$200 -> $240"), "{}", candidate.title);
        assert!(candidate.source_url.is_none());
    }
}
