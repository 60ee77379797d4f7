//! Model warm-up at startup
//!
//! Ollama loads a model on its first request, which can take longer than the
//! read timeout on cold hardware. An empty prompt loads the model without
//! generating anything, and `keep_alive` keeps it resident afterwards.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;

use crate::upstream::{GenerateRequest, GenerationSettings, Upstream};

/// Send the warm-up request in the background
///
/// Never awaited by the server; failures are logged and otherwise ignored.
pub fn spawn(upstream: Arc<dyn Upstream>, settings: GenerationSettings) -> JoinHandle<()> {
    tokio::spawn(async move {
        let request = GenerateRequest::new(&settings, String::new());
        let start = Instant::now();

        tracing::info!(
            model = %settings.model,
            keep_alive = ?settings.keep_alive,
            "Warming up model"
        );

        match upstream.generate(&request).await {
            Ok(_) => tracing::info!(
                model = %settings.model,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Model warm-up complete"
            ),
            Err(e) => tracing::warn!(
                model = %settings.model,
                error = %e,
                "Model warm-up failed; the first analysis will load the model instead"
            ),
        }
    })
}
