pub mod health;
pub mod metadata;
pub mod metrics;
mod patient;

use axum::{
    Router,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;

use crate::state::AppState;

pub const FHIR_JSON: &str = "application/fhir+json";

/// Serialize a FHIR body with the `application/fhir+json` media type
pub fn fhir_json<T: Serialize>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, HeaderValue::from_static(FHIR_JSON))],
            bytes,
        )
            .into_response(),
        Err(error) => {
            tracing::error!(%error, "Failed to serialize response body");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Build FHIR routes
pub fn fhir_routes() -> Router<AppState> {
    Router::new()
        .route("/Patient", get(patient::search).post(patient::create))
        .route("/Patient/$validate", post(patient::validate))
        .route(
            "/Patient/{id}",
            get(patient::read)
                .put(patient::update)
                .delete(patient::delete),
        )
        .route("/Patient/{id}/$everything", get(patient::everything))
}
