//! HTTP error mapping
//!
//! Engine and editor errors are typed; this is the only place they are
//! turned into status codes and JSON bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::engine::{EngineError, ErrorKind};
use crate::forms::EditError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Malformed request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Engine(err) => match err.kind() {
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ErrorKind::PreconditionFailed => (StatusCode::FORBIDDEN, "FORM_NOT_PUBLISHED"),
                ErrorKind::ValidationFailed => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED")
                }
                ErrorKind::StorageFailure => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_FAILURE")
                }
            },
            ApiError::Edit(err) => match err {
                EditError::FormNotFound(_) | EditError::FieldNotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND")
                }
                EditError::InvalidField(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_FIELD"),
                EditError::NonContiguousSteps { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "NON_CONTIGUOUS_STEPS")
                }
                EditError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_FAILURE"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
        }

        let mut body = json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        });
        if let ApiError::Engine(EngineError::ValidationFailed { field_id, .. }) = &self {
            body["error"]["field_id"] = json!(field_id);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
