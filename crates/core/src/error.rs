use crate::outcome::{IssueType, OperationOutcome};
use thiserror::Error;

/// Errors raised at the patient store boundary
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Patient/{0} already exists or has been retired")]
    AlreadyExists(String),

    #[error("Patient/{id} version conflict: expected {expected}, found {actual:?}")]
    VersionConflict {
        id: String,
        expected: i32,
        actual: Option<i32>,
    },

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Patient service error types
#[derive(Debug, Error)]
pub enum FhirError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid resource: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("Version conflict: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FhirError {
    /// Single-message validation failure
    pub fn invalid(message: impl Into<String>) -> Self {
        FhirError::Invalid(vec![message.into()])
    }

    /// Render as an OperationOutcome.
    ///
    /// Store and internal failures collapse to a generic message so backend
    /// diagnostics never reach the caller.
    pub fn to_outcome(&self) -> OperationOutcome {
        match self {
            FhirError::NotFound(msg) => OperationOutcome::not_found(msg),
            FhirError::Invalid(messages) => OperationOutcome::violations(messages),
            FhirError::Conflict(msg) => OperationOutcome::conflict(msg),
            FhirError::PreconditionFailed(msg) => OperationOutcome::conflict(msg),
            FhirError::Store(_) => OperationOutcome::error(IssueType::Exception, "Database error"),
            FhirError::Internal(_) => {
                OperationOutcome::error(IssueType::Exception, "Internal server error")
            }
        }
    }
}

impl From<StoreError> for FhirError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(id) => {
                FhirError::Conflict(format!("Patient/{} already exists", id))
            }
            StoreError::VersionConflict {
                id, actual: None, ..
            } => FhirError::NotFound(format!("Patient/{} not found", id)),
            StoreError::VersionConflict {
                id,
                expected,
                actual: Some(actual),
            } => FhirError::Conflict(format!(
                "Patient/{} was modified concurrently (expected version {}, found {})",
                id, expected, actual
            )),
            StoreError::Backend(msg) => FhirError::Store(msg),
        }
    }
}

impl From<serde_json::Error> for FhirError {
    fn from(err: serde_json::Error) -> Self {
        FhirError::Internal(format!("Serialization error: {}", err))
    }
}
