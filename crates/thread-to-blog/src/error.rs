use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::generator::GenerateError;
use crate::rate_limit::RateLimitExceeded;

pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded – try again later.";
pub const COMING_SOON_MESSAGE: &str = "Coming soon, just paste thread for now.";
pub const MISSING_THREAD_MESSAGE: &str = "Thread text is required.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),

    #[error("generation from a thread URL is not supported yet")]
    ComingSoon,

    #[error("thread text is missing or blank")]
    MissingThreadText,

    #[error(transparent)]
    Generate(#[from] GenerateError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::RateLimited(exceeded) => {
                let mut resp = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": RATE_LIMIT_MESSAGE })),
                )
                    .into_response();
                resp.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(exceeded.retry_after_secs()),
                );
                resp
            }
            AppError::ComingSoon => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "comingSoon": true, "message": COMING_SOON_MESSAGE })),
            )
                .into_response(),
            AppError::MissingThreadText => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": MISSING_THREAD_MESSAGE })),
            )
                .into_response(),
            // Upstream failures get no structured body; the details only go to the log.
            AppError::Generate(_) | AppError::Config(_) => {
                error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
