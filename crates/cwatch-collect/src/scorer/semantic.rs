//! Classifier-backed scorer speaking the OpenAI-compatible chat-completions shape.

use std::time::Duration;

use async_trait::async_trait;
use cwatch_core::{AppConfig, SignalCategory};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::{summarize, Relevance, RelevanceScorer};
use crate::error::CollectError;
use crate::retry::retry_with_backoff;

const CONTENT_EXCERPT_CHARS: usize = 4_000;

const SYSTEM_PROMPT: &str = "You rate competitive-intelligence signals about a competitor. \
Reply with a JSON object: {\"score\": integer 1-10, \"summary\": one factual sentence, \
\"is_relevant\": boolean}. 9-10: acquisitions, funding, leadership changes, bankruptcy, layoffs. \
7-8: expansion, partnerships, major launches, material revenue news. \
5-6: notable hiring or product updates. 1-4: routine noise.";

#[derive(Debug, Clone)]
pub struct SemanticScorerConfig {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl SemanticScorerConfig {
    /// `None` unless both the classifier URL and API key are configured.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        let url = config.classifier_url.clone()?;
        let api_key = config.classifier_api_key.clone()?;
        Some(Self {
            url,
            api_key,
            model: config.classifier_model.clone(),
            timeout_secs: config.classifier_timeout_secs,
            max_retries: config.classifier_max_retries,
            backoff_ms: config.fetch_backoff_ms,
        })
    }
}

/// Delegates scoring to an external classifier.
///
/// Transient failures (timeouts, connection resets, 429, 5xx) are retried up
/// to `max_retries` times with linear back-off. Any remaining failure, or an
/// answer that cannot be parsed, degrades to the neutral score.
pub struct SemanticScorer {
    client: Client,
    config: SemanticScorerConfig,
}

impl SemanticScorer {
    /// # Errors
    ///
    /// Returns [`CollectError::Http`] if the HTTP client cannot be built.
    pub fn new(config: SemanticScorerConfig) -> Result<Self, CollectError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }

    fn request_body(
        &self,
        category: SignalCategory,
        title: &str,
        content: &str,
        entity_name: &str,
    ) -> Value {
        let excerpt: String = content.chars().take(CONTENT_EXCERPT_CHARS).collect();
        json!({
            "model": self.config.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!(
                        "Competitor: {entity_name}\nCategory: {category}\nTitle: {title}\n\nContent:\n{excerpt}"
                    )
                }
            ],
            "temperature": 0.0
        })
    }

    async fn request_once(&self, body: &Value) -> Result<String, CollectError> {
        let url = self.config.url.as_str();
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CollectError::RateLimited {
                url: url.to_string(),
                retry_after_secs: 0,
            });
        }
        if !status.is_success() {
            return Err(CollectError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await.map_err(|e| self.classify(e))?;
        let payload: Value =
            serde_json::from_str(&text).map_err(|source| CollectError::Deserialize {
                context: "classifier response".to_string(),
                source,
            })?;

        Ok(payload
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    fn classify(&self, err: reqwest::Error) -> CollectError {
        if err.is_timeout() {
            CollectError::Timeout {
                url: self.config.url.clone(),
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            CollectError::Http(err)
        }
    }
}

#[async_trait]
impl RelevanceScorer for SemanticScorer {
    async fn score(
        &self,
        category: SignalCategory,
        title: &str,
        content: &str,
        entity_name: &str,
    ) -> Relevance {
        let fallback = summarize(title, content);
        let body = self.request_body(category, title, content, entity_name);
        let body = &body;

        let answer = retry_with_backoff(self.config.max_retries, self.config.backoff_ms, move || {
            self.request_once(body)
        })
        .await;

        match answer {
            Ok(raw) => parse_classifier_output(&raw, &fallback).unwrap_or_else(|| {
                tracing::warn!(entity = entity_name, %category, "unparseable classifier answer; using neutral score");
                Relevance::neutral(fallback)
            }),
            Err(e) => {
                tracing::warn!(entity = entity_name, %category, error = %e, "classifier unavailable; using neutral score");
                Relevance::neutral(fallback)
            }
        }
    }
}

/// Parse a classifier answer leniently.
///
/// Accepts bare JSON or JSON embedded in surrounding prose or code fences;
/// `score` may be an integer, a float, or a numeric string. Returns `None`
/// when no score can be recovered. `is_relevant` is always re-derived from
/// the score.
#[must_use]
pub fn parse_classifier_output(raw: &str, fallback_summary: &str) -> Option<Relevance> {
    let value = serde_json::from_str::<Value>(raw.trim())
        .ok()
        .filter(Value::is_object)
        .or_else(|| embedded_object(raw))?;

    let score = value.get("score").and_then(score_from_value)?;
    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback_summary);

    Some(Relevance::new(score, summary))
}

fn embedded_object(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&raw[start..=end])
        .ok()
        .filter(Value::is_object)
}

#[allow(clippy::cast_possible_truncation)]
fn score_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let r = parse_classifier_output(
            r#"{"score": 8, "summary": "Opened two sites", "is_relevant": true}"#,
            "fb",
        )
        .unwrap();
        assert_eq!(r.score, 8);
        assert_eq!(r.summary, "Opened two sites");
        assert!(r.is_relevant);
    }

    #[test]
    fn parses_fenced_json_with_string_score() {
        let raw = "Sure!\n```json\n{\"score\": \"3.6\", \"summary\": \"\"}\n```";
        let r = parse_classifier_output(raw, "fallback").unwrap();
        assert_eq!(r.score, 4);
        assert_eq!(r.summary, "fallback");
        assert!(!r.is_relevant);
    }

    #[test]
    fn relevance_flag_follows_score_not_model() {
        let r = parse_classifier_output(r#"{"score": 2, "is_relevant": true}"#, "fb").unwrap();
        assert!(!r.is_relevant);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        assert_eq!(
            parse_classifier_output(r#"{"score": 15}"#, "fb").unwrap().score,
            10
        );
        assert_eq!(
            parse_classifier_output(r#"{"score": 0}"#, "fb").unwrap().score,
            1
        );
    }

    #[test]
    fn garbage_yields_none() {
        assert!(parse_classifier_output("I think it's important", "fb").is_none());
        assert!(parse_classifier_output(r#"{"summary": "no score"}"#, "fb").is_none());
        assert!(parse_classifier_output(r#"{"score": "high"}"#, "fb").is_none());
        assert!(parse_classifier_output("} nope {", "fb").is_none());
    }
}
