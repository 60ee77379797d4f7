//! `POST /analyze`

use axum::{
    Extension, Json,
    extract::State,
    http::HeaderValue,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::handlers::extractor::ApiJson;
use crate::middleware::RequestId;
use crate::pipeline::AnalysisRequest;

/// Response header telling clients whether the result came from the cache
pub const CACHE_HEADER: &str = "x-cache";

/// Analyze a resume
///
/// The pipeline runs in its own task: if the client disconnects, the
/// upstream call still completes (bounded by its timeouts) and a valid
/// result still lands in the cache for the next identical request.
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(request): ApiJson<AnalysisRequest>,
) -> AppResult<Response> {
    tracing::debug!(
        request_id = %request_id,
        text_length = request.text.as_ref().map(|t| t.chars().count()).unwrap_or(0),
        pages = ?request.pages,
        "Received analysis request"
    );

    let analyzer = state.analyzer().clone();
    let outcome = tokio::spawn(async move { analyzer.analyze(request, request_id).await })
        .await
        .map_err(|e| {
            tracing::error!(request_id = %request_id, error = %e, "Analysis task panicked");
            AppError::Internal(format!("analysis task failed: {e}"))
        })??;

    let mut response = Json(outcome.result.as_ref()).into_response();
    response.headers_mut().insert(
        CACHE_HEADER,
        HeaderValue::from_static(if outcome.cached { "hit" } else { "miss" }),
    );
    Ok(response)
}
