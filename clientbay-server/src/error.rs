//! Maps [`CoreError`] onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clientbay_core::error::CoreError;

#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            CoreError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": "authentication required" }),
            ),
            CoreError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, serde_json::json!({ "error": msg }))
            }
            CoreError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg }))
            }
            CoreError::Conflict(msg) => {
                (StatusCode::CONFLICT, serde_json::json!({ "error": msg }))
            }
            CoreError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "validation failed",
                    "details": fields,
                }),
            ),
            CoreError::Internal(msg) => {
                tracing::error!(%msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
