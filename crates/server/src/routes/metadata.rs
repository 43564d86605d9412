//! Metadata endpoint handler

use axum::response::Response;
use patient_core::CapabilityStatement;

use super::fhir_json;

/// GET /metadata - Return server capability statement
pub async fn get() -> Response {
    fhir_json(&CapabilityStatement::new())
}
