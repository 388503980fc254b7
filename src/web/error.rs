use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::alerting::AlertStoreError;
use crate::lgtm::LgtmError;
use crate::server::settings::SettingsError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, slow down".to_string(),
            ),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<AlertStoreError> for AppError {
    fn from(err: AlertStoreError) -> Self {
        match err {
            AlertStoreError::NotFound { .. } => AppError::NotFound(err.to_string()),
            AlertStoreError::Invalid(msg) => AppError::InvalidInput(msg),
        }
    }
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<LgtmError> for AppError {
    fn from(err: LgtmError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalServerError(format!("JSON serialization error: {err}"))
    }
}
