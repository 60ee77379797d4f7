//! HTTP client for Ollama's `/api/generate`
//!
//! Timeouts are two-phase and enforced independently:
//! - the connect timeout is enforced by the HTTP client's connector
//! - the read timeout is a deadline covering the request and the whole body
//!   (or the whole stream, when streaming)

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tokio::time::Instant;

use super::retry::{RetryPolicy, with_retry};
use super::stream::{StreamAccumulator, StreamProgress};
use super::{GenerateRequest, ModelReply, Upstream};
use crate::config::UpstreamConfig;
use crate::error::{AppError, AppResult, UpstreamError, truncate_body};
use crate::metrics::{Metrics, UpstreamOutcome};

/// Path of the generation endpoint, relative to the base URL
pub const GENERATE_PATH: &str = "/api/generate";

/// Ollama-compatible generation client with retries
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    generate_url: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    retry: RetryPolicy,
    metrics: Metrics,
}

impl OllamaClient {
    /// Build a client from upstream configuration
    ///
    /// # Errors
    /// Returns `AppError::Config` if the retry policy is invalid or the
    /// HTTP client cannot be constructed (e.g., TLS backend failure).
    pub fn new(config: &UpstreamConfig, metrics: Metrics) -> AppResult<Self> {
        let connect_timeout = config.connect_timeout();
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        let retry = RetryPolicy::new(config.max_attempts(), config.retry_backoff_ms())
            .map_err(|e| AppError::Config(format!("upstream.{e}")))?;

        Ok(Self {
            client,
            generate_url: format!("{}{}", config.base_url().trim_end_matches('/'), GENERATE_PATH),
            connect_timeout,
            read_timeout: config.read_timeout(),
            retry,
            metrics,
        })
    }

    /// Full URL of the generation endpoint
    pub fn generate_url(&self) -> &str {
        &self.generate_url
    }

    /// One attempt, no retries
    async fn attempt(
        &self,
        request: &GenerateRequest,
        attempt: usize,
    ) -> Result<ModelReply, UpstreamError> {
        let deadline = Instant::now() + self.read_timeout;

        tracing::debug!(
            url = %self.generate_url,
            model = %request.model,
            stream = request.stream,
            prompt_length = request.prompt.chars().count(),
            attempt = attempt,
            "Sending generation request"
        );

        let response = tokio::time::timeout_at(
            deadline,
            self.client.post(&self.generate_url).json(request).send(),
        )
        .await
        .map_err(|_| self.read_timeout_error())?
        .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = tokio::time::timeout_at(deadline, response.text())
                .await
                .ok()
                .and_then(Result::ok)
                .unwrap_or_default();
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        if request.stream {
            self.read_stream(response, deadline).await
        } else {
            let body = tokio::time::timeout_at(deadline, response.text())
                .await
                .map_err(|_| self.read_timeout_error())?
                .map_err(|e| self.classify(e))?;
            Ok(reply_from_body(body))
        }
    }

    async fn read_stream(
        &self,
        response: reqwest::Response,
        deadline: Instant,
    ) -> Result<ModelReply, UpstreamError> {
        let mut body = response.bytes_stream();
        let mut accumulator = StreamAccumulator::new();

        loop {
            let next = tokio::time::timeout_at(deadline, body.next())
                .await
                .map_err(|_| {
                    tracing::warn!(
                        url = %self.generate_url,
                        chunks_received = accumulator.chunks(),
                        text_length = accumulator.text().chars().count(),
                        "Stream did not produce a complete document before the deadline"
                    );
                    self.read_timeout_error()
                })?;

            match next {
                Some(Ok(bytes)) => match accumulator.push(&bytes)? {
                    StreamProgress::Pending => {}
                    StreamProgress::Parsed(document) => {
                        tracing::debug!(
                            chunks_received = accumulator.chunks(),
                            "Complete JSON document received, closing stream early"
                        );
                        return Ok(ModelReply::Document(document));
                    }
                    StreamProgress::Done => return Ok(accumulator.into_reply()),
                },
                Some(Err(e)) => return Err(self.classify(e)),
                None => return accumulator.finish(),
            }
        }
    }

    fn read_timeout_error(&self) -> UpstreamError {
        UpstreamError::ReadTimeout {
            url: self.generate_url.clone(),
            timeout_ms: duration_ms(self.read_timeout),
        }
    }

    fn classify(&self, error: reqwest::Error) -> UpstreamError {
        if error.is_connect() && error.is_timeout() {
            UpstreamError::ConnectTimeout {
                url: self.generate_url.clone(),
                timeout_ms: duration_ms(self.connect_timeout),
            }
        } else if error.is_timeout() {
            self.read_timeout_error()
        } else {
            UpstreamError::Network {
                url: self.generate_url.clone(),
                reason: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl Upstream for OllamaClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelReply, UpstreamError> {
        with_retry(&self.retry, |attempt| async move {
            let result = self.attempt(request, attempt).await;
            self.metrics.record_upstream_attempt(match &result {
                Ok(_) => UpstreamOutcome::Success,
                Err(e) if e.is_timeout() => UpstreamOutcome::Timeout,
                Err(UpstreamError::Http { .. }) => UpstreamOutcome::HttpError,
                Err(_) => UpstreamOutcome::NetworkError,
            });
            result
        })
        .await
    }
}

/// Decode a non-streaming `/api/generate` body
///
/// The envelope's `response` field holds the model's text (itself JSON when
/// `format` is `json`). A body that is not an envelope is handed to the
/// parser unchanged.
pub fn reply_from_body(body: String) -> ModelReply {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(mut envelope)) => match envelope.remove("response") {
            Some(Value::String(text)) => ModelReply::Text(text),
            Some(document) => ModelReply::Document(document),
            None => ModelReply::Document(Value::Object(envelope)),
        },
        _ => ModelReply::Text(body),
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_response_string_becomes_text() {
        let body = json!({"model": "llama3", "response": "{\"a\": 1}", "done": true}).to_string();
        assert_eq!(reply_from_body(body), ModelReply::Text("{\"a\": 1}".to_string()));
    }

    #[test]
    fn test_envelope_response_object_becomes_document() {
        let body = json!({"response": {"a": 1}, "done": true}).to_string();
        assert_eq!(reply_from_body(body), ModelReply::Document(json!({"a": 1})));
    }

    #[test]
    fn test_bare_document_is_passed_through() {
        let body = json!({"scores": [], "comments": []}).to_string();
        assert_eq!(
            reply_from_body(body),
            ModelReply::Document(json!({"scores": [], "comments": []}))
        );
    }

    #[test]
    fn test_non_json_body_becomes_text() {
        let body = "Sure! {\"a\": 1}".to_string();
        assert_eq!(reply_from_body(body.clone()), ModelReply::Text(body));
    }

    #[test]
    fn test_generate_url_joins_base_without_double_slash() {
        let toml = r#"
[upstream]
base_url = "http://localhost:11434/"
"#;
        let config: crate::config::Config = toml::from_str(toml).unwrap();
        let client = OllamaClient::new(&config.upstream, Metrics::new().unwrap()).unwrap();
        assert_eq!(client.generate_url(), "http://localhost:11434/api/generate");
    }
}
