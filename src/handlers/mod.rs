//! HTTP request handlers and router assembly

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cache::ResponseCache;
use crate::config::{Config, CorsConfig};
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use crate::pipeline::Analyzer;
use crate::upstream::{GenerationSettings, OllamaClient, Upstream};

pub mod analyze;
pub mod extractor;
pub mod health;
pub mod metrics;
pub mod model_info;

/// Application state shared across all handlers
///
/// All fields are Arc'd (or Arc-backed) for cheap cloning across handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    analyzer: Arc<Analyzer>,
    upstream: Arc<dyn Upstream>,
    metrics: Metrics,
}

impl AppState {
    /// Build the state for a validated configuration
    ///
    /// # Errors
    /// Returns an error if metrics registration or HTTP client construction
    /// fails.
    pub fn new(config: Config) -> AppResult<Self> {
        let metrics = Metrics::new()
            .map_err(|e| AppError::Internal(format!("failed to register metrics: {e}")))?;
        let client = OllamaClient::new(&config.upstream, metrics.clone())?;
        Ok(Self::with_upstream(config, Arc::new(client), metrics))
    }

    /// Build the state around an existing upstream implementation
    pub fn with_upstream(config: Config, upstream: Arc<dyn Upstream>, metrics: Metrics) -> Self {
        let cache = Arc::new(ResponseCache::new(config.cache.capacity));
        let analyzer = Analyzer::new(
            Arc::clone(&upstream),
            cache,
            GenerationSettings::from(&config.upstream),
            config.limits.clone(),
            metrics.clone(),
        );

        Self {
            config: Arc::new(config),
            analyzer: Arc::new(analyzer),
            upstream,
            metrics,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn analyzer(&self) -> &Arc<Analyzer> {
        &self.analyzer
    }

    pub fn upstream(&self) -> &Arc<dyn Upstream> {
        &self.upstream
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Assemble the application router with all middleware
///
/// `GET /` and `POST /` mirror `/health` and `/analyze` for proxies that
/// strip the path prefix.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config().limits.max_body_bytes;
    let cors = cors_layer(&state.config().cors);

    Router::new()
        .route("/", get(health::handler).post(analyze::handler))
        .route("/health", get(health::handler))
        .route("/analyze", post(analyze::handler))
        .route("/model_info", get(model_info::handler))
        .route("/metrics", get(metrics::handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// CORS policy for the configured origins
///
/// Origins that are not valid header values are skipped with a warning.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([
            header::HeaderName::from_static(crate::middleware::REQUEST_ID_HEADER),
            header::HeaderName::from_static(analyze::CACHE_HEADER),
        ]);

    if config.allows_any() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
