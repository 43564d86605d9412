//! Health check endpoint

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    storage: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// GET /health - Check store connectivity and return server health status
pub async fn check(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.service.store();

    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                storage: store.backend_name(),
                reason: None,
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, storage = store.backend_name(), "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    storage: store.backend_name(),
                    reason: Some("Store unreachable".to_string()),
                }),
            )
        }
    }
}
