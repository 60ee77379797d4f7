//! `GET /model_info`: effective model configuration and cache occupancy

use axum::{Json, extract::State};
use serde::Serialize;

use crate::cache::CacheStats;
use crate::handlers::AppState;

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub model: String,
    pub upstream_url: String,
    pub stream: bool,
    pub max_tokens: u32,
    pub temperature: f64,
    pub limits: Limits,
    pub timeouts: Timeouts,
    pub retry: Retry,
    pub cache: CacheStats,
}

#[derive(Debug, Serialize)]
pub struct Limits {
    pub max_input_chars: usize,
    pub max_request_chars: usize,
    pub max_pages: u32,
    pub max_body_bytes: usize,
}

#[derive(Debug, Serialize)]
pub struct Timeouts {
    pub connect_seconds: f64,
    pub read_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct Retry {
    pub max_attempts: usize,
    pub backoff_ms: u64,
}

pub async fn handler(State(state): State<AppState>) -> Json<ModelInfo> {
    let upstream = &state.config().upstream;
    let limits = state.analyzer().limits();

    Json(ModelInfo {
        model: upstream.model().to_string(),
        upstream_url: upstream.base_url().to_string(),
        stream: upstream.stream(),
        max_tokens: upstream.max_tokens(),
        temperature: upstream.temperature(),
        limits: Limits {
            max_input_chars: limits.max_input_chars,
            max_request_chars: limits.max_request_chars,
            max_pages: limits.max_pages,
            max_body_bytes: limits.max_body_bytes,
        },
        timeouts: Timeouts {
            connect_seconds: upstream.connect_timeout().as_secs_f64(),
            read_seconds: upstream.read_timeout().as_secs(),
        },
        retry: Retry {
            max_attempts: upstream.max_attempts(),
            backoff_ms: upstream.retry_backoff_ms(),
        },
        cache: state.analyzer().cache().stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_model_info_reports_effective_configuration() {
        let config = Config::from_str(
            r#"
[upstream]
model = "mistral"
base_url = "http://ollama:11434"
stream = true

[cache]
capacity = 16
"#,
        )
        .unwrap();
        let state = AppState::new(config).unwrap();

        let Json(info) = handler(State(state)).await;
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["model"], "mistral");
        assert_eq!(json["upstream_url"], "http://ollama:11434");
        assert_eq!(json["stream"], true);
        assert_eq!(json["limits"]["max_input_chars"], 12_000);
        assert_eq!(json["timeouts"]["read_seconds"], 120);
        assert_eq!(json["timeouts"]["connect_seconds"], 5.0);
        assert_eq!(json["retry"]["max_attempts"], 3);
        assert_eq!(json["cache"]["capacity"], 16);
        assert_eq!(json["cache"]["entries"], 0);
    }
}
