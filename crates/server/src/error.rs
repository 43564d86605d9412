//! Application error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use patient_core::{FhirError, OperationOutcome};

use crate::routes::fhir_json;

/// Application error type
#[derive(Debug)]
pub struct AppError(pub FhirError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            FhirError::NotFound(_) => StatusCode::NOT_FOUND,
            FhirError::Invalid(_) => StatusCode::BAD_REQUEST,
            FhirError::Conflict(_) => StatusCode::CONFLICT,
            FhirError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            FhirError::Store(_) | FhirError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn outcome(&self) -> OperationOutcome {
        self.0.to_outcome()
    }
}

impl From<FhirError> for AppError {
    fn from(err: FhirError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            // Full detail stays in the log; the body carries the generic text
            tracing::error!(error = %self.0, "Request failed");
        }

        (status, fhir_json(&self.outcome())).into_response()
    }
}
