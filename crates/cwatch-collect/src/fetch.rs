//! The raw-content fetch capability every collector goes through.

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{header, Client, StatusCode};

use crate::error::CollectError;
use crate::retry::retry_with_backoff;

/// Per-request timeout is clamped to this range.
pub const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 10..=120;

/// Per-request fetch options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Route the request through the rendering proxy, when one is configured.
    pub render: bool,
    /// Value for the `Accept` header.
    pub accept: Option<&'static str>,
}

impl FetchOptions {
    #[must_use]
    pub fn json() -> Self {
        Self {
            render: false,
            accept: Some("application/json"),
        }
    }

    #[must_use]
    pub fn rendered_html() -> Self {
        Self {
            render: true,
            accept: Some("text/html"),
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the body at `url` as text.
    async fn fetch_raw(&self, url: &str, options: &FetchOptions) -> Result<String, CollectError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub render_proxy_url: Option<String>,
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl HttpFetcherConfig {
    #[must_use]
    pub fn from_app_config(config: &cwatch_core::AppConfig) -> Self {
        Self {
            timeout_secs: config.fetch_timeout_secs,
            user_agent: config.fetch_user_agent.clone(),
            render_proxy_url: config.render_proxy_url.clone(),
            max_retries: config.fetch_max_retries,
            backoff_ms: config.fetch_backoff_ms,
        }
    }
}

/// `reqwest`-backed [`Fetcher`] with timeout, optional render proxy, and
/// bounded retry on transient failures.
pub struct HttpFetcher {
    client: Client,
    timeout_secs: u64,
    render_proxy_url: Option<String>,
    max_retries: u32,
    backoff_ms: u64,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns [`CollectError::Http`] if the underlying client cannot be built.
    pub fn new(config: HttpFetcherConfig) -> Result<Self, CollectError> {
        let timeout_secs = config
            .timeout_secs
            .clamp(*TIMEOUT_RANGE_SECS.start(), *TIMEOUT_RANGE_SECS.end());
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent)
            .build()?;
        Ok(Self {
            client,
            timeout_secs,
            render_proxy_url: config.render_proxy_url,
            max_retries: config.max_retries,
            backoff_ms: config.backoff_ms,
        })
    }

    /// The URL actually requested: the target itself, or the render proxy
    /// with the target percent-encoded in its `url` query parameter.
    pub(crate) fn request_url(&self, url: &str, options: &FetchOptions) -> String {
        match (&self.render_proxy_url, options.render) {
            (Some(proxy), true) => {
                let sep = if proxy.contains('?') { '&' } else { '?' };
                let encoded = utf8_percent_encode(url, NON_ALPHANUMERIC);
                format!("{proxy}{sep}url={encoded}")
            }
            _ => url.to_string(),
        }
    }

    async fn fetch_once(&self, target: &str, options: &FetchOptions) -> Result<String, CollectError> {
        let mut request = self.client.get(target);
        if let Some(accept) = options.accept {
            request = request.header(header::ACCEPT, accept);
        }

        let response = request.send().await.map_err(|e| self.classify(e, target))?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(CollectError::RateLimited {
                url: target.to_string(),
                retry_after_secs,
            });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(CollectError::NotFound {
                url: target.to_string(),
            });
        }

        if !status.is_success() {
            return Err(CollectError::UnexpectedStatus {
                status: status.as_u16(),
                url: target.to_string(),
            });
        }

        response.text().await.map_err(|e| self.classify(e, target))
    }

    fn classify(&self, err: reqwest::Error, target: &str) -> CollectError {
        if err.is_timeout() {
            CollectError::Timeout {
                url: target.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            CollectError::Http(err)
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_raw(&self, url: &str, options: &FetchOptions) -> Result<String, CollectError> {
        let target = self.request_url(url, options);
        let target = target.as_str();
        retry_with_backoff(self.max_retries, self.backoff_ms, move || {
            self.fetch_once(target, options)
        })
        .await
    }
}
