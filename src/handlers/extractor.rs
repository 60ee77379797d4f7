//! JSON extractor whose rejections use the API's error body
//!
//! Wraps Axum's `Json` extractor so that malformed bodies, wrong content
//! types and oversized bodies produce `{"error": ..., "kind": ...}` instead
//! of Axum's plain-text rejections.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Rejection produced by [`ApiJson`]
///
/// Status codes:
/// - JSON syntax or shape errors: 400
/// - missing `Content-Type: application/json`: 415
/// - body over the configured limit: 413
#[derive(Debug)]
pub struct ApiJsonRejection(JsonRejection);

impl ApiJsonRejection {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_) => {
                StatusCode::BAD_REQUEST
            }
            JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            // Body read failures; carries 413 when the body limit was hit
            other => other.status(),
        }
    }
}

impl IntoResponse for ApiJsonRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            JsonRejection::MissingJsonContentType(_) => {
                "Content-Type must be application/json".to_string()
            }
            _ if status == StatusCode::PAYLOAD_TOO_LARGE => "Request body too large".to_string(),
            other => other.body_text(),
        };
        let kind = if status.is_client_error() {
            "validation"
        } else {
            "internal"
        };

        (
            status,
            Json(serde_json::json!({
                "error": message,
                "kind": kind,
            })),
        )
            .into_response()
    }
}

/// `Json<T>` with JSON-shaped rejections
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiJsonRejection(rejection)),
        }
    }
}
