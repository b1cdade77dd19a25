//! Signal collection: fetch, canonicalize, detect change, score, dedup, write.

pub mod canonical;
pub mod change;
pub mod collector;
pub mod dedup;
pub mod error;
pub mod fetch;
pub mod lock;
pub mod pipeline;
pub(crate) mod retry;
pub mod runs;
pub mod scorer;
pub mod store;

pub use canonical::{canonicalize_html, fingerprint};
pub use collector::{CollectMode, Collector, Endpoint};
pub use dedup::{content_hash, DedupPolicy, DuplicateReason};
pub use error::CollectError;
pub use fetch::{FetchOptions, Fetcher, HttpFetcher, HttpFetcherConfig};
pub use lock::KeyedLocks;
pub use pipeline::{
    collect_all, CollectRunSummary, Pipeline, PipelineSettings, UnitReport, WriteOutcome,
};
pub use runs::{pg_pipeline, run_recorded_collection, RecordedRun};
pub use scorer::{
    build_scorer, HeuristicScorer, Relevance, RelevanceScorer, SemanticScorer,
    SemanticScorerConfig,
};
pub use store::{MemoryStore, PgStore, SignalStore, SnapshotStore};
