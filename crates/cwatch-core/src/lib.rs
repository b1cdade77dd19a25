pub mod app_config;
pub mod config;
pub mod entities;
pub mod filters;
pub mod signals;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use entities::{load_entities, parse_entities, EntitiesFile, EntityConfig};
pub use filters::{contains_keyword, load_filters, FilterConfig, KeywordTiers};
pub use signals::{
    Entity, NewSignal, Signal, SignalCandidate, SignalCategory, Snapshot, SourceKind,
    RELEVANCE_THRESHOLD,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown source kind: {0}")]
    UnknownSourceKind(String),

    #[error("unknown signal category: {0}")]
    UnknownCategory(String),
}
