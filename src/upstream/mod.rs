//! Upstream model server client
//!
//! Talks to an Ollama-compatible `/api/generate` endpoint. The [`Upstream`]
//! trait is the seam the pipeline depends on, so tests can substitute a
//! scripted implementation without a network.

pub mod ollama;
pub mod retry;
pub mod stream;

pub use crate::analysis::parse::ModelReply;
pub use ollama::OllamaClient;
pub use retry::{RetryPolicy, calculate_backoff};

use async_trait::async_trait;
use serde::Serialize;

use crate::config::UpstreamConfig;
use crate::error::UpstreamError;

/// Output format hint sent with every generation request
pub const JSON_FORMAT: &str = "json";

/// Client for a text-generation backend
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Run one generation request, including transport-level retries
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelReply, UpstreamError>;
}

/// Model parameters shared by every request the pipeline issues
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub stream: bool,
    pub max_tokens: u32,
    pub temperature: f64,
    pub keep_alive: Option<String>,
}

impl From<&UpstreamConfig> for GenerationSettings {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            model: config.model().to_string(),
            stream: config.stream(),
            max_tokens: config.max_tokens(),
            temperature: config.temperature(),
            keep_alive: config.keep_alive().map(str::to_string),
        }
    }
}

/// Body of a `POST /api/generate` call
///
/// Built fresh for every call and never reused.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub format: &'static str,
    pub stream: bool,
    pub options: GenerateOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

/// Sampling options forwarded to the model server
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    pub num_predict: u32,
    pub temperature: f64,
}

impl GenerateRequest {
    /// Build a JSON-format generation request for `prompt`
    pub fn new(settings: &GenerationSettings, prompt: String) -> Self {
        Self {
            model: settings.model.clone(),
            prompt,
            format: JSON_FORMAT,
            stream: settings.stream,
            options: GenerateOptions {
                num_predict: settings.max_tokens,
                temperature: settings.temperature,
            },
            keep_alive: settings.keep_alive.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GenerationSettings {
        GenerationSettings {
            model: "llama3".to_string(),
            stream: false,
            max_tokens: 512,
            temperature: 0.2,
            keep_alive: None,
        }
    }

    #[test]
    fn test_request_serializes_to_ollama_shape() {
        let request = GenerateRequest::new(&settings(), "Analyze this".to_string());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "llama3");
        assert_eq!(json["prompt"], "Analyze this");
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 512);
        assert_eq!(json["options"]["temperature"], 0.2);
        assert!(json.get("keep_alive").is_none());
    }

    #[test]
    fn test_keep_alive_is_forwarded_when_set() {
        let mut settings = settings();
        settings.keep_alive = Some("30m".to_string());
        settings.stream = true;

        let json = serde_json::to_value(GenerateRequest::new(&settings, String::new())).unwrap();
        assert_eq!(json["keep_alive"], "30m");
        assert_eq!(json["stream"], true);
    }
}
