//! patient-server library crate
//!
//! Exposes `build_app`, `config` and the store wiring for integration tests.
//! The actual binary entrypoint is in `main.rs`.

pub mod audit;
pub mod config;
pub mod db;
mod error;
mod middleware;
mod routes;
pub mod state;

use std::sync::Arc;

use axum::{Extension, Router, middleware as axum_mw, routing::get};
use patient_core::{InMemoryPatientStore, PatientService, PatientStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use audit::Auditor;
use config::Config;
use db::{AuditLog, PatientRepository};
use middleware::ApiKeyAuth;
use state::AppState;

/// Startup failures
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Database(#[from] db::DbError),

    #[error("failed to seed reference patients: {0}")]
    Seed(#[from] patient_core::FhirError),
}

/// Select the store from configuration and assemble the shared state.
///
/// With `DATABASE_URL` set the schema is applied and audit rows are
/// persisted; otherwise everything lives in process memory.
pub async fn build_state(config: &Config) -> Result<AppState, StartupError> {
    let (store, auditor) = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            db::apply_schema(&pool).await?;
            let store: Arc<dyn PatientStore> = Arc::new(PatientRepository::new(pool.clone()));
            (store, Auditor::new(Some(AuditLog::new(pool))))
        }
        None => {
            let store: Arc<dyn PatientStore> = Arc::new(InMemoryPatientStore::new());
            (store, Auditor::default())
        }
    };
    tracing::info!(storage = store.backend_name(), "Patient store selected");

    let service = PatientService::new(store).with_max_page_size(config.max_page_size);
    if config.seed_test_patients {
        service.seed_reference_patients().await?;
    }

    Ok(AppState::new(service, auditor, config.base_url.clone()))
}

/// Build the full application router with all routes and middleware.
///
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a TCP port.
pub fn build_app(state: AppState, config: &Config) -> Router {
    let auth = ApiKeyAuth::new(config.api_key.clone());
    let rate_limiter = middleware::create_rate_limiter(config.rate_limit_rps);

    // Protected routes (require auth)
    let protected_routes = Router::new()
        .nest("/fhir", routes::fhir_routes())
        .layer(axum_mw::from_fn(middleware::auth_middleware))
        .layer(Extension(auth))
        .layer(axum_mw::from_fn(middleware::rate_limit_middleware))
        .layer(Extension(rate_limiter));

    // build_recorder() + set_global_recorder() so a second install (tests)
    // is ignored while still yielding a usable handle.
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let prometheus_handle = recorder.handle();
    let _ = metrics::set_global_recorder(recorder);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/metadata", get(routes::metadata::get))
        .route("/fhir/metadata", get(routes::metadata::get))
        .route("/health", get(routes::health::check))
        .route("/metrics", get(routes::metrics::get))
        .layer(Extension(prometheus_handle));

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(axum_mw::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn(middleware::metrics_middleware))
}
