//! Engine error taxonomy

use evfb_common::db::{FieldId, FormId};
use thiserror::Error;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Form not found: {0}")]
    FormNotFound(FormId),

    #[error("Form {0} is not published")]
    FormNotPublished(FormId),

    #[error("Submission not found")]
    SessionNotFound,

    /// First required field of the step that had no answer
    #[error("Required field missing: {label} (field {field_id})")]
    ValidationFailed { field_id: FieldId, label: String },

    #[error("Storage failure: {0}")]
    Storage(#[from] evfb_common::Error),
}

/// Presentation class of an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PreconditionFailed,
    ValidationFailed,
    StorageFailure,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::FormNotFound(_) | EngineError::SessionNotFound => ErrorKind::NotFound,
            EngineError::FormNotPublished(_) => ErrorKind::PreconditionFailed,
            EngineError::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            EngineError::Storage(_) => ErrorKind::StorageFailure,
        }
    }
}
