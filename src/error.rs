//! Error types for the resume reviewer
//!
//! All errors implement `IntoResponse` for Axum handlers. Every failure is
//! rendered as a JSON body with at least an `error` field.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::analysis::OutputError;

/// Maximum number of characters of an upstream body echoed back to clients
pub const MAX_ECHOED_BODY_CHARS: usize = 500;

/// Failures talking to the upstream model server
///
/// Classified so the retry loop can tell transient transport problems from
/// permanent ones, and so the HTTP layer can tell timeouts (504) from other
/// gateway failures (502).
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Connecting to {url} timed out after {timeout_ms} ms")]
    ConnectTimeout { url: String, timeout_ms: u64 },

    #[error("No complete response from {url} within {timeout_ms} ms")]
    ReadTimeout { url: String, timeout_ms: u64 },

    #[error("Model server returned HTTP {status}")]
    Http { status: u16, body: String },

    #[error("Network error talking to {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Model server reported an error mid-stream: {reason}")]
    Stream { reason: String },

    #[error("Model server unavailable after {attempts} attempts: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<UpstreamError>,
    },
}

impl UpstreamError {
    /// Whether another attempt at the transport level may succeed
    ///
    /// 5xx responses, connect failures, read timeouts and dropped connections
    /// are transient. 4xx responses and errors reported by the model itself
    /// are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectTimeout { .. } | Self::ReadTimeout { .. } | Self::Network { .. } => true,
            Self::Http { status, .. } => (500..600).contains(status),
            Self::Stream { .. } | Self::Exhausted { .. } => false,
        }
    }

    /// Whether the failure (or the last failure before giving up) was a timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::ConnectTimeout { .. } | Self::ReadTimeout { .. } => true,
            Self::Exhausted { last, .. } => last.is_timeout(),
            _ => false,
        }
    }

    /// The innermost error, unwrapping `Exhausted`
    pub fn root(&self) -> &UpstreamError {
        match self {
            Self::Exhausted { last, .. } => last.root(),
            other => other,
        }
    }

    /// Stable label used in error bodies and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectTimeout { .. } => "connect_timeout",
            Self::ReadTimeout { .. } => "read_timeout",
            Self::Http { .. } => "upstream_http",
            Self::Network { .. } => "network",
            Self::Stream { .. } => "upstream_stream",
            Self::Exhausted { last, .. } => last.kind(),
        }
    }
}

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Model returned unusable output after {attempts} attempts: {source}")]
    ModelOutput {
        attempts: usize,
        #[source]
        source: OutputError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upstream(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(_) | Self::ModelOutput { .. } => StatusCode::BAD_GATEWAY,
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable label for the error class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::PayloadTooLarge(_) => "validation",
            Self::Upstream(e) if e.is_timeout() => "upstream_timeout",
            Self::Upstream(_) => "upstream",
            Self::ModelOutput { .. } => "model_output",
            _ => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            Self::Upstream(e) => {
                let mut body = serde_json::json!({
                    "error": self.to_string(),
                    "kind": self.kind(),
                    "cause": e.kind(),
                });
                if let UpstreamError::Http { status, body: upstream_body } = e.root() {
                    body["upstream_status"] = serde_json::json!(status);
                    body["upstream_body"] = serde_json::json!(upstream_body);
                }
                if let UpstreamError::Exhausted { attempts, .. } = e {
                    body["attempts"] = serde_json::json!(attempts);
                }
                body
            }
            Self::ModelOutput { attempts, .. } => serde_json::json!({
                "error": self.to_string(),
                "kind": self.kind(),
                "attempts": attempts,
            }),
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::Internal(_) => {
                tracing::error!(error = %self, "Internal error while handling request");
                serde_json::json!({
                    "error": "Internal server error",
                    "kind": self.kind(),
                })
            }
            Self::Validation(_) | Self::PayloadTooLarge(_) => serde_json::json!({
                "error": self.to_string(),
                "kind": self.kind(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Truncate an upstream body for inclusion in error messages
pub fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_ECHOED_BODY_CHARS {
        let mut truncated: String = body.chars().take(MAX_ECHOED_BODY_CHARS).collect();
        truncated.push_str("...");
        truncated
    } else {
        body.to_string()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
