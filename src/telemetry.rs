//! Structured logging setup with tracing and tracing-subscriber

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(level: &str) -> String {
    format!("resume_reviewer={level},tower_http=info")
}

/// Initialize the tracing subscriber
///
/// Only the first call per process has an effect. `RUST_LOG` wins over
/// `default_level` (the configured `observability.log_level`).
///
/// # Examples
///
/// ```no_run
/// resume_reviewer::telemetry::init("info");
/// tracing::info!("Application started");
/// ```
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(default_level)));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
