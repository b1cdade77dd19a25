//! Per-source-kind collectors behind one dispatch type.
//!
//! Every kind answers the same questions: where to fetch for an entity, how
//! to canonicalize what came back, what changed between two canonical
//! captures, and which signal candidates that yields. Control flow lives in
//! the pipeline; only source-specific parsing lives here.

mod app_listing;
mod filings;
mod hiring;
mod news;
mod pricing;
mod reviews;
mod social;
mod webpage;

use chrono::{DateTime, Utc};
use cwatch_core::{Entity, SignalCandidate, SourceKind};

use crate::error::CollectError;
use crate::fetch::FetchOptions;

/// How a kind turns fetched content into candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectMode {
    /// Every fetched item is potentially new; novelty is the dedup guard's job.
    Discovery,
    /// Content is compared against the previous snapshot. With `baseline`,
    /// the first capture also yields a signal.
    Snapshot { baseline: bool },
}

/// Where and how to fetch one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub options: FetchOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collector {
    kind: SourceKind,
}

impl Collector {
    #[must_use]
    pub fn new(kind: SourceKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub fn kind(self) -> SourceKind {
        self.kind
    }

    #[must_use]
    pub fn mode(self) -> CollectMode {
        match self.kind {
            SourceKind::News | SourceKind::Hiring | SourceKind::Filings => CollectMode::Discovery,
            SourceKind::EmployerReviews => CollectMode::Snapshot { baseline: true },
            SourceKind::Pricing
            | SourceKind::AppListing
            | SourceKind::Social
            | SourceKind::Webpage => CollectMode::Snapshot { baseline: false },
        }
    }

    /// Resolve the fetch target for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::MissingEndpoint`] when the entity lacks the
    /// source endpoint this kind needs. Callers report it as skipped.
    pub fn endpoint(self, entity: &Entity) -> Result<Endpoint, CollectError> {
        let missing = |field| CollectError::MissingEndpoint {
            kind: self.kind,
            field,
        };
        let url = |value: &Option<String>, field| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| missing(field))
        };

        match self.kind {
            SourceKind::News => Ok(Endpoint {
                url: news::search_url(&entity.name),
                options: FetchOptions {
                    render: false,
                    accept: Some("application/rss+xml"),
                },
            }),
            SourceKind::Hiring => Ok(Endpoint {
                url: url(&entity.careers_url, "careers_url")?,
                options: FetchOptions::json(),
            }),
            SourceKind::Filings => {
                let id = url(&entity.regulatory_id, "regulatory_id")?;
                Ok(Endpoint {
                    url: filings::submissions_url(&id).ok_or_else(|| missing("regulatory_id"))?,
                    options: FetchOptions::json(),
                })
            }
            SourceKind::Pricing => Ok(Endpoint {
                url: url(&entity.listings_url, "listings_url")?,
                options: FetchOptions::rendered_html(),
            }),
            SourceKind::AppListing => Ok(Endpoint {
                url: app_listing::lookup_url(&url(&entity.app_id, "app_id")?),
                options: FetchOptions::json(),
            }),
            SourceKind::EmployerReviews => Ok(Endpoint {
                url: url(&entity.reviews_url, "reviews_url")?,
                options: FetchOptions::rendered_html(),
            }),
            SourceKind::Social => Ok(Endpoint {
                url: social::profile_url(&url(&entity.social_handle, "social_handle")?),
                options: FetchOptions::rendered_html(),
            }),
            SourceKind::Webpage => Ok(Endpoint {
                url: entity.website.clone(),
                options: FetchOptions::rendered_html(),
            }),
        }
    }

    /// Canonical form of a snapshot-kind capture, or `None` when nothing
    /// recognizable could be extracted.
    #[must_use]
    pub fn canonicalize(self, raw: &str) -> Option<String> {
        match self.kind {
            SourceKind::Pricing => pricing::canonicalize(raw),
            SourceKind::AppListing => app_listing::canonicalize(raw),
            SourceKind::EmployerReviews => reviews::canonicalize(raw),
            SourceKind::Social => social::canonicalize(raw),
            SourceKind::Webpage => webpage::canonicalize(raw),
            SourceKind::News | SourceKind::Hiring | SourceKind::Filings => None,
        }
    }

    /// Compare two canonical captures. `None` when no dimension met its threshold.
    #[must_use]
    pub fn diff(
        self,
        entity: &Entity,
        endpoint: &str,
        old: &str,
        new: &str,
        now: DateTime<Utc>,
    ) -> Option<SignalCandidate> {
        let ctx = Context {
            entity,
            endpoint,
            now,
        };
        match self.kind {
            SourceKind::Pricing => pricing::diff(&ctx, old, new),
            SourceKind::AppListing => app_listing::diff(&ctx, old, new),
            SourceKind::EmployerReviews => reviews::diff(&ctx, old, new),
            SourceKind::Social => social::diff(&ctx, old, new),
            SourceKind::Webpage => webpage::diff(&ctx, old, new),
            SourceKind::News | SourceKind::Hiring | SourceKind::Filings => None,
        }
    }

    /// First-observation signal for kinds whose mode asks for one.
    #[must_use]
    pub fn baseline(
        self,
        entity: &Entity,
        endpoint: &str,
        canonical: &str,
        now: DateTime<Utc>,
    ) -> Option<SignalCandidate> {
        let ctx = Context {
            entity,
            endpoint,
            now,
        };
        match self.kind {
            SourceKind::EmployerReviews => reviews::baseline(&ctx, canonical),
            _ => None,
        }
    }

    /// Candidates from a discovery-kind fetch.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Deserialize`] or [`CollectError::Xml`] when the
    /// payload is not the expected format at all.
    pub fn discover(
        self,
        entity: &Entity,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SignalCandidate>, CollectError> {
        match self.kind {
            SourceKind::News => news::discover(entity, raw, now),
            SourceKind::Hiring => hiring::discover(entity, raw, now),
            SourceKind::Filings => filings::discover(entity, raw, now),
            SourceKind::Pricing
            | SourceKind::AppListing
            | SourceKind::EmployerReviews
            | SourceKind::Social
            | SourceKind::Webpage => Ok(Vec::new()),
        }
    }
}

/// What change detectors need besides the two captures.
pub(crate) struct Context<'a> {
    pub entity: &'a Entity,
    pub endpoint: &'a str,
    pub now: DateTime<Utc>,
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
pub(crate) fn test_entity() -> Entity {
    Entity {
        id: 1,
        name: "Desk Harbor".to_string(),
        slug: "desk-harbor".to_string(),
        website: "https://deskharbor.example".to_string(),
        careers_url: Some("https://boards.example/deskharbor".to_string()),
        listings_url: Some("https://deskharbor.example/locations".to_string()),
        social_handle: Some("@deskharbor".to_string()),
        app_id: Some("123456".to_string()),
        reviews_url: Some("https://reviews.example/deskharbor".to_string()),
        regulatory_id: Some("320193".to_string()),
        is_active: true,
    }
}
