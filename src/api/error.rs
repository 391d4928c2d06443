use crate::detector::InvalidReadingError;
use crate::registry::InvalidRegistrationError;
use crate::thresholds::InvalidThresholdError;
use crate::trigger::{TriggerAttempt, TriggerError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Error response
#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
    /// Attempt log of a failed orchestration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<Vec<TriggerAttempt>>,
}

impl ErrorResponse {
    pub(crate) fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            attempts: None,
        }
    }
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFound(String),
    Unauthorized,
    /// Activation failed on every path that was tried
    TriggerFailed {
        message: String,
        attempts: Vec<TriggerAttempt>,
    },
}

impl From<InvalidReadingError> for AppError {
    fn from(e: InvalidReadingError) -> Self {
        AppError::ValidationError(e.to_string())
    }
}

impl From<InvalidThresholdError> for AppError {
    fn from(e: InvalidThresholdError) -> Self {
        AppError::ValidationError(e.to_string())
    }
}

impl From<InvalidRegistrationError> for AppError {
    fn from(e: InvalidRegistrationError) -> Self {
        AppError::ValidationError(e.to_string())
    }
}

impl From<TriggerError> for AppError {
    fn from(e: TriggerError) -> Self {
        match e {
            TriggerError::UnknownCamera { .. } => AppError::NotFound(e.to_string()),
            TriggerError::NoCamera => AppError::ValidationError(e.to_string()),
            TriggerError::AllPathsFailed { .. } => AppError::TriggerFailed {
                message: e.to_string(),
                attempts: e.attempts().to_vec(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(msg)),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, ErrorResponse::new("Unauthorized")),
            AppError::TriggerFailed { message, attempts } => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse {
                    error: message,
                    attempts: Some(attempts),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}
