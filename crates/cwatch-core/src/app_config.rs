use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub entities_path: PathBuf,
    pub filters_path: Option<PathBuf>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub fetch_user_agent: String,
    pub render_proxy_url: Option<String>,
    pub fetch_max_retries: u32,
    pub fetch_backoff_ms: u64,
    pub max_concurrent_units: usize,
    pub classifier_url: Option<String>,
    pub classifier_api_key: Option<String>,
    pub classifier_model: String,
    pub classifier_timeout_secs: u64,
    pub classifier_max_retries: u32,
    pub min_signal_score: u8,
    pub signal_retention_days: i64,
    pub hash_dedup_days: i64,
    pub pattern_window_days: i64,
    pub pattern_signal_cap: i64,
    pub collect_cron: String,
}

impl AppConfig {
    /// Whether enough classifier settings are present to use the semantic scorer.
    #[must_use]
    pub fn semantic_scoring_enabled(&self) -> bool {
        self.classifier_url.is_some() && self.classifier_api_key.is_some()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("entities_path", &self.entities_path)
            .field("filters_path", &self.filters_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_user_agent", &self.fetch_user_agent)
            .field("render_proxy_url", &self.render_proxy_url)
            .field("fetch_max_retries", &self.fetch_max_retries)
            .field("fetch_backoff_ms", &self.fetch_backoff_ms)
            .field("max_concurrent_units", &self.max_concurrent_units)
            .field("classifier_url", &self.classifier_url)
            .field(
                "classifier_api_key",
                &self.classifier_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("classifier_model", &self.classifier_model)
            .field("classifier_timeout_secs", &self.classifier_timeout_secs)
            .field("classifier_max_retries", &self.classifier_max_retries)
            .field("min_signal_score", &self.min_signal_score)
            .field("signal_retention_days", &self.signal_retention_days)
            .field("hash_dedup_days", &self.hash_dedup_days)
            .field("pattern_window_days", &self.pattern_window_days)
            .field("pattern_signal_cap", &self.pattern_signal_cap)
            .field("collect_cron", &self.collect_cron)
            .finish()
    }
}
