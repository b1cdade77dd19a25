//! Domain types shared by collection, persistence, and aggregation.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// Scores at or above this value mark a signal as strategically relevant.
pub const RELEVANCE_THRESHOLD: u8 = 5;

/// The kind of source a collector reads for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    News,
    Hiring,
    Pricing,
    AppListing,
    EmployerReviews,
    Social,
    Filings,
    Webpage,
}

impl SourceKind {
    pub const ALL: [SourceKind; 8] = [
        SourceKind::News,
        SourceKind::Hiring,
        SourceKind::Pricing,
        SourceKind::AppListing,
        SourceKind::EmployerReviews,
        SourceKind::Social,
        SourceKind::Filings,
        SourceKind::Webpage,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::News => "news",
            SourceKind::Hiring => "hiring",
            SourceKind::Pricing => "pricing",
            SourceKind::AppListing => "app_listing",
            SourceKind::EmployerReviews => "employer_reviews",
            SourceKind::Social => "social",
            SourceKind::Filings => "filings",
            SourceKind::Webpage => "webpage",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::UnknownSourceKind(s.to_string()))
    }
}

/// Category tag carried by every signal; patterns group on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Hiring,
    Pricing,
    Product,
    Funding,
    Leadership,
    Expansion,
    Partnership,
    Regulatory,
    Reputation,
    Social,
    Webpage,
    News,
}

impl SignalCategory {
    pub const ALL: [SignalCategory; 12] = [
        SignalCategory::Hiring,
        SignalCategory::Pricing,
        SignalCategory::Product,
        SignalCategory::Funding,
        SignalCategory::Leadership,
        SignalCategory::Expansion,
        SignalCategory::Partnership,
        SignalCategory::Regulatory,
        SignalCategory::Reputation,
        SignalCategory::Social,
        SignalCategory::Webpage,
        SignalCategory::News,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SignalCategory::Hiring => "hiring",
            SignalCategory::Pricing => "pricing",
            SignalCategory::Product => "product",
            SignalCategory::Funding => "funding",
            SignalCategory::Leadership => "leadership",
            SignalCategory::Expansion => "expansion",
            SignalCategory::Partnership => "partnership",
            SignalCategory::Regulatory => "regulatory",
            SignalCategory::Reputation => "reputation",
            SignalCategory::Social => "social",
            SignalCategory::Webpage => "webpage",
            SignalCategory::News => "news",
        }
    }
}

impl std::fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignalCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::UnknownCategory(s.to_string()))
    }
}

/// A tracked competitor and its optional source endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub website: String,
    pub careers_url: Option<String>,
    pub listings_url: Option<String>,
    pub social_handle: Option<String>,
    pub app_id: Option<String>,
    pub reviews_url: Option<String>,
    pub regulatory_id: Option<String>,
    pub is_active: bool,
}

/// Point-in-time capture of one source for one entity. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    pub entity_id: i64,
    pub source_kind: SourceKind,
    pub fingerprint: String,
    pub raw_content: String,
    pub created_at: DateTime<Utc>,
}

/// An observation a collector believes may be worth a signal.
///
/// Not yet scored or deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalCandidate {
    pub category: SignalCategory,
    pub title: String,
    pub summary: String,
    /// Text handed to the relevance scorer.
    pub content: String,
    pub source_url: Option<String>,
    /// Category-specific identity material (job title + location, page id, ...).
    /// Hashed by the dedup guard; `None` disables the content-hash check.
    pub dedup_key: Option<String>,
    pub raw_payload: serde_json::Value,
    pub detected_at: DateTime<Utc>,
}

/// A scored, deduplicated signal ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewSignal {
    pub entity_id: i64,
    pub category: SignalCategory,
    pub title: String,
    pub summary: String,
    pub raw_payload: serde_json::Value,
    pub source_url: Option<String>,
    pub content_hash: Option<String>,
    pub relevance_score: u8,
    pub is_relevant: bool,
    pub detected_at: DateTime<Utc>,
}

/// A persisted signal. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: i64,
    pub public_id: Uuid,
    pub entity_id: i64,
    pub category: SignalCategory,
    pub title: String,
    pub summary: String,
    pub raw_payload: serde_json::Value,
    pub source_url: Option<String>,
    pub content_hash: Option<String>,
    pub relevance_score: u8,
    pub is_relevant: bool,
    pub detected_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_round_trips_through_str() {
        for kind in SourceKind::ALL {
            assert_eq!(kind.as_str().parse::<SourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_source_kind_is_an_error() {
        let err = "carrier_pigeon".parse::<SourceKind>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownSourceKind(ref s) if s == "carrier_pigeon"));
    }

    #[test]
    fn category_serializes_as_snake_case() {
        let json = serde_json::to_string(&SignalCategory::Hiring).unwrap();
        assert_eq!(json, "\"hiring\"");
        let kind = serde_json::to_string(&SourceKind::EmployerReviews).unwrap();
        assert_eq!(kind, "\"employer_reviews\"");
    }

    #[test]
    fn category_display_matches_as_str() {
        assert_eq!(SignalCategory::Partnership.to_string(), "partnership");
        assert_eq!(
            "regulatory".parse::<SignalCategory>().unwrap(),
            SignalCategory::Regulatory
        );
    }
}
