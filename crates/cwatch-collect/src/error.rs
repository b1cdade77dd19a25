use cwatch_core::SourceKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("rate limited by {url} (retry after {retry_after_secs}s)")]
    RateLimited { url: String, retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("store error: {0}")]
    Store(#[from] cwatch_db::DbError),

    #[error("{kind} collector needs {field}, which is not configured")]
    MissingEndpoint {
        kind: SourceKind,
        field: &'static str,
    },
}

impl CollectError {
    /// Whether retrying the same request may succeed.
    ///
    /// Timeouts, connection failures, 429 and 5xx are transient. Everything
    /// else (4xx, malformed payloads, store failures, configuration) is not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            CollectError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            CollectError::Timeout { .. } | CollectError::RateLimited { .. } => true,
            CollectError::UnexpectedStatus { status, .. } => *status >= 500,
            CollectError::NotFound { .. }
            | CollectError::Deserialize { .. }
            | CollectError::Xml(_)
            | CollectError::Store(_)
            | CollectError::MissingEndpoint { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_throttling_are_transient() {
        assert!(CollectError::UnexpectedStatus {
            status: 503,
            url: "u".to_string()
        }
        .is_transient());
        assert!(CollectError::RateLimited {
            url: "u".to_string(),
            retry_after_secs: 1
        }
        .is_transient());
        assert!(CollectError::Timeout {
            url: "u".to_string(),
            timeout_secs: 10
        }
        .is_transient());
    }

    #[test]
    fn client_errors_and_config_are_not_transient() {
        assert!(!CollectError::UnexpectedStatus {
            status: 403,
            url: "u".to_string()
        }
        .is_transient());
        assert!(!CollectError::NotFound {
            url: "u".to_string()
        }
        .is_transient());
        assert!(!CollectError::MissingEndpoint {
            kind: SourceKind::Hiring,
            field: "careers_url"
        }
        .is_transient());
        let source = serde_json::from_str::<()>("nope").unwrap_err();
        assert!(!CollectError::Deserialize {
            context: "test".to_string(),
            source
        }
        .is_transient());
    }
}
