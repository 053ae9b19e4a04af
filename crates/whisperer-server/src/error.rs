use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use whisperer_core::error::AppError;

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `AppError`.
///
/// Holds an `Arc` because cached pipeline runs share their error between
/// every waiting request.
pub struct ApiError(pub Arc<AppError>);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(Arc::new(err))
    }
}

impl From<Arc<AppError>> for ApiError {
    fn from(err: Arc<AppError>) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> (StatusCode, &'static str) {
        let err = self.0.as_ref();
        if err.is_bad_input() {
            return (StatusCode::BAD_REQUEST, "bad_input");
        }
        match err {
            AppError::NoResults { .. } => (StatusCode::NOT_FOUND, "no_results"),
            AppError::JobFailed { .. } => (StatusCode::BAD_GATEWAY, "job_failed"),
            AppError::JobApi { .. } => (StatusCode::BAD_GATEWAY, "inference_api"),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            AppError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let body = ErrorResponse::new(error_type, self.0.user_message());
        (status, axum::Json(body)).into_response()
    }
}
