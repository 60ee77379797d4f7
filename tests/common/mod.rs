//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::str::FromStr;

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use resume_reviewer::analysis::RUBRIC_CATEGORIES;
use resume_reviewer::config::Config;
use resume_reviewer::handlers::{self, AppState};
use serde_json::{Value, json};

/// A schema-conforming analysis document
pub fn valid_analysis() -> Value {
    json!({
        "scores": RUBRIC_CATEGORIES
            .iter()
            .enumerate()
            .map(|(i, name)| json!({"name": name, "score": (i % 5) + 1, "max": 5}))
            .collect::<Vec<_>>(),
        "comments": [
            "Lead with measurable outcomes for each role.",
            "Move the skills section above education."
        ]
    })
}

/// A non-streaming `/api/generate` body whose `response` is `text`
pub fn generate_envelope(text: &str) -> Value {
    json!({
        "model": "llama3",
        "created_at": "2024-05-01T12:00:00Z",
        "response": text,
        "done": true,
    })
}

/// Configuration pointing at a mock model server
///
/// Retries back off for only 10ms so failure tests stay fast. `extra` is
/// appended verbatim (use it for additional sections).
pub fn config_for(base_url: &str, upstream_extra: &str, extra: &str) -> Config {
    Config::from_str(&format!(
        r#"
[upstream]
base_url = "{base_url}"
model = "llama3"
retry_backoff_ms = 10
warmup = false
{upstream_extra}

{extra}
"#
    ))
    .expect("test config should be valid")
}

pub fn app_for(config: Config) -> (Router, AppState) {
    let state = AppState::new(config).expect("state should build");
    (handlers::router(state.clone()), state)
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}
