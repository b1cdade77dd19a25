//! Keyword configuration for heuristic scoring and the strategic hiring filter.
//!
//! The built-in lists are starting points only. Deployments override them via
//! `CWATCH_FILTERS_PATH`; any field left out of the YAML keeps its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Keyword tiers evaluated by the heuristic scorer, most severe first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTiers {
    pub critical: Vec<String>,
    pub high: Vec<String>,
    pub medium: Vec<String>,
}

impl Default for KeywordTiers {
    fn default() -> Self {
        Self {
            critical: to_owned_list(&[
                "acquisition",
                "acquires",
                "acquired",
                "merger",
                "bankruptcy",
                "chapter 11",
                "steps down",
                "new ceo",
                "funding round",
                "raises",
                "series a",
                "series b",
                "series c",
                "ipo",
                "layoffs",
                "shuts down",
            ]),
            high: to_owned_list(&[
                "expansion",
                "expands",
                "new location",
                "opens",
                "partnership",
                "partners with",
                "appoints",
                "chief",
                "vice president",
                "head of",
                "revenue",
                "profitability",
                "record growth",
            ]),
            medium: to_owned_list(&[
                "hiring",
                "job opening",
                "now hiring",
                "update",
                "release",
                "new feature",
                "price",
                "promotion",
            ]),
        }
    }
}

/// Strategic-relevance filter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub keywords: KeywordTiers,
    /// Frontline/operational role keywords that do not count as strategic hiring.
    pub hiring_denylist: Vec<String>,
    /// Denylisted hiring signals still count when scored at or above this value.
    pub hiring_override_score: u8,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            keywords: KeywordTiers::default(),
            hiring_denylist: to_owned_list(&[
                "barista",
                "cashier",
                "cleaner",
                "janitor",
                "custodian",
                "receptionist",
                "front desk",
                "community associate",
                "host",
                "server",
                "driver",
                "warehouse",
                "security guard",
                "retail associate",
                "housekeeper",
                "line cook",
                "dishwasher",
            ]),
            hiring_override_score: 9,
        }
    }
}

impl FilterConfig {
    /// Returns the first denylisted role keyword found in `text`, if any.
    #[must_use]
    pub fn denylisted_role<'a>(&'a self, text: &str) -> Option<&'a str> {
        let lower = text.to_lowercase();
        self.hiring_denylist
            .iter()
            .find(|kw| contains_keyword(&lower, kw))
            .map(String::as_str)
    }
}

/// Load filter configuration, falling back to built-in defaults when `path` is `None`.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_filters(path: Option<&Path>) -> Result<FilterConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(FilterConfig::default());
    };
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    let filters: FilterConfig = serde_yaml::from_str(&content)?;
    if !(1..=10).contains(&filters.hiring_override_score) {
        return Err(ConfigError::Validation(format!(
            "hiring_override_score {} must be within 1..=10",
            filters.hiring_override_score
        )));
    }
    Ok(filters)
}

/// Whole-word/phrase match of `keyword` inside already-lowercased `haystack`.
///
/// A match must be bounded by non-alphanumeric characters or the string edges,
/// so `"host"` does not match `"ghost"` and `"ipo"` does not match `"tipoff"`.
#[must_use]
pub fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return false;
    }
    let is_word = |c: char| c.is_alphanumeric();
    haystack.match_indices(&keyword).any(|(start, _)| {
        let before_ok = haystack[..start].chars().next_back().is_none_or(|c| !is_word(c));
        let end = start + keyword.len();
        let after_ok = haystack[end..].chars().next().is_none_or(|c| !is_word(c));
        before_ok && after_ok
    })
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_filters_file_matches_built_in_defaults() {
        let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/filters.yaml"));
        let shipped = load_filters(Some(path)).unwrap();
        assert_eq!(shipped, FilterConfig::default());
    }

    #[test]
    fn keyword_requires_word_boundaries() {
        assert!(contains_keyword("we are hiring a host", "host"));
        assert!(!contains_keyword("ghost kitchen opens", "host"));
        assert!(!contains_keyword("tipoff from a source", "ipo"));
        assert!(contains_keyword("files for ipo.", "ipo"));
    }

    #[test]
    fn keyword_matches_multi_word_phrases() {
        assert!(contains_keyword(
            "acme announces new ceo after board vote",
            "new ceo"
        ));
        assert!(!contains_keyword("renew ceo contract", "new ceo"));
    }

    #[test]
    fn empty_keyword_never_matches() {
        assert!(!contains_keyword("anything", "  "));
    }

    #[test]
    fn denylisted_role_detects_frontline_titles() {
        let filters = FilterConfig::default();
        assert_eq!(
            filters.denylisted_role("Barista - Downtown"),
            Some("barista")
        );
        assert_eq!(filters.denylisted_role("VP of Engineering"), None);
    }

    #[test]
    fn load_filters_without_path_uses_defaults() {
        let filters = load_filters(None).unwrap();
        assert_eq!(filters, FilterConfig::default());
        assert_eq!(filters.hiring_override_score, 9);
    }

    #[test]
    fn partial_yaml_keeps_remaining_defaults() {
        let filters: FilterConfig = serde_yaml::from_str("hiring_denylist: [courier]\n").unwrap();
        assert_eq!(filters.hiring_denylist, vec!["courier".to_string()]);
        assert_eq!(filters.keywords, KeywordTiers::default());
        assert_eq!(filters.hiring_override_score, 9);
    }
}
