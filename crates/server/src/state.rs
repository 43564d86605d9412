//! Shared application state

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use patient_core::PatientService;

use crate::audit::Auditor;

#[derive(Clone)]
pub struct AppState {
    pub service: PatientService,
    pub auditor: Auditor,
    /// Fixed base for Bundle links; `None` derives it from `Host`
    pub base_url: Option<String>,
}

impl AppState {
    pub fn new(service: PatientService, auditor: Auditor, base_url: Option<String>) -> Self {
        Self {
            service,
            auditor,
            base_url,
        }
    }
}

/// Absolute FHIR base URL for links in responses
#[derive(Debug, Clone)]
pub struct BaseUrl(pub String);

impl FromRequestParts<AppState> for BaseUrl {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(base) = &state.base_url {
            return Ok(BaseUrl(base.clone()));
        }

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .unwrap_or("localhost");

        Ok(BaseUrl(format!("http://{}/fhir", host)))
    }
}
