use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::scraping::ScrapeError;
use crate::tasks::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error("Task store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Scrape(e) => {
                let (status, code) = match e {
                    ScrapeError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "INVALID_URL"),
                    ScrapeError::FetchTimeout => (StatusCode::GATEWAY_TIMEOUT, "FETCH_TIMEOUT"),
                    ScrapeError::AccessDenied => (StatusCode::BAD_GATEWAY, "ACCESS_DENIED"),
                    ScrapeError::NotFound => (StatusCode::NOT_FOUND, "JOB_NOT_FOUND"),
                    ScrapeError::FetchFailed(_) => (StatusCode::BAD_GATEWAY, "FETCH_FAILED"),
                    ScrapeError::InsufficientContent { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_CONTENT")
                    }
                };
                tracing::warn!("Scrape failed: {e}");
                (status, code, e.to_string())
            }
            AppError::Store(e) => {
                tracing::error!("Task store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "A task storage error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
