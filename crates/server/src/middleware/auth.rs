use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use patient_core::OperationOutcome;

use crate::routes::fhir_json;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// API Key authentication state
#[derive(Clone)]
pub struct ApiKeyAuth {
    api_key: Option<String>,
}

/// Who made the request, as recorded in the audit trail
#[derive(Debug, Clone)]
pub struct Actor(pub String);

impl ApiKeyAuth {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    /// Resolve the caller, or `None` when the key is missing or wrong
    fn authenticate(&self, headers: &HeaderMap) -> Option<Actor> {
        let Some(expected) = &self.api_key else {
            return Some(Actor("anonymous".to_string()));
        };

        let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())?;
        (provided == expected).then(|| Actor("api-key".to_string()))
    }
}

/// Reject requests without a valid `X-API-Key` when a key is configured
pub async fn auth_middleware(mut request: Request<Body>, next: Next) -> Response {
    let auth = request.extensions().get::<ApiKeyAuth>().cloned();

    let actor = match auth {
        Some(auth) => auth.authenticate(request.headers()),
        None => Some(Actor("anonymous".to_string())),
    };

    match actor {
        Some(actor) => {
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        None => {
            tracing::warn!(path = %request.uri().path(), "Rejected request with missing or invalid API key");
            let outcome = OperationOutcome::security("Missing or invalid API key");
            (StatusCode::UNAUTHORIZED, fhir_json(&outcome)).into_response()
        }
    }
}
