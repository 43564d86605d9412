//! Patient resource HTTP handlers

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use patient_core::{FhirError, OperationOutcome, PatientFilter, PatientResource, SearchParams};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::fhir_json;
use crate::audit::{AuditAction, AuditContext};
use crate::error::AppError;
use crate::state::{AppState, BaseUrl};

/// Query parameters for patient search.
///
/// Paging values arrive as raw strings so a malformed `_count` or `_offset`
/// falls back to the default instead of rejecting the request.
#[derive(Debug, Deserialize, Default)]
pub struct PatientQuery {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub identifier: Option<String>,
    pub family: Option<String>,
    pub given: Option<String>,
    pub name: Option<String>,
    pub birthdate: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "address-city")]
    pub city: Option<String>,
    #[serde(rename = "address-state")]
    pub state: Option<String>,
    #[serde(rename = "address-postalcode")]
    pub postal_code: Option<String>,
    #[serde(rename = "_count")]
    pub count: Option<String>,
    #[serde(rename = "_offset")]
    pub offset: Option<String>,
}

fn lenient_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse().ok())
}

impl PatientQuery {
    pub fn into_params(self) -> SearchParams {
        let count = lenient_int(self.count.as_deref());
        let offset = lenient_int(self.offset.as_deref());
        let filter = PatientFilter {
            id: self.id,
            identifier: self.identifier,
            family: self.family,
            given: self.given,
            name: self.name,
            birthdate: self.birthdate,
            gender: self.gender,
            phone: self.phone,
            email: self.email,
            address: self.address,
            city: self.city,
            state: self.state,
            postal_code: self.postal_code,
        };

        SearchParams::new(filter).with_page(offset, count)
    }
}

fn parse_body(body: &Bytes) -> Result<JsonValue, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError(FhirError::invalid(format!("Request body is not valid JSON: {}", e))))
}

/// Accepts `W/"3"`, `"3"` or `3`. `*` places no constraint.
fn parse_if_match(headers: &HeaderMap) -> Result<Option<i32>, AppError> {
    let Some(raw) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };

    let value = raw.to_str().unwrap_or_default().trim();
    if value == "*" {
        return Ok(None);
    }

    value
        .trim_start_matches("W/")
        .trim_matches('"')
        .parse()
        .map(Some)
        .map_err(|_| AppError(FhirError::invalid(format!("Malformed If-Match header '{}'", value))))
}

/// ETag and Last-Modified for a stored version
fn version_headers(resource: &PatientResource) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let Some(meta) = &resource.meta else {
        return headers;
    };

    if let Some(version) = &meta.version_id {
        if let Ok(etag) = HeaderValue::from_str(&format!("W/\"{}\"", version)) {
            headers.insert(header::ETAG, etag);
        }
    }
    if let Some(updated) = meta.last_updated {
        let http_date = updated.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        if let Ok(value) = HeaderValue::from_str(&http_date) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }

    headers
}

/// GET /fhir/Patient - Search patients
pub async fn search(
    State(state): State<AppState>,
    BaseUrl(base): BaseUrl,
    Query(query): Query<PatientQuery>,
) -> Result<Response, AppError> {
    let bundle = state.service.search(query.into_params(), &base).await?;
    Ok(fhir_json(&bundle))
}

/// POST /fhir/Patient - Create a new patient
pub async fn create(
    State(state): State<AppState>,
    BaseUrl(base): BaseUrl,
    ctx: AuditContext,
    body: Bytes,
) -> Result<Response, AppError> {
    let created = state.service.create(parse_body(&body)?).await?;
    let id = created.id.clone().unwrap_or_default();
    state
        .auditor
        .record(AuditAction::Create, &id, created.version(), &ctx)
        .await;

    let mut headers = version_headers(&created);
    if let Ok(location) = HeaderValue::from_str(&format!("{}/Patient/{}", base, id)) {
        headers.insert(header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, fhir_json(&created)).into_response())
}

/// GET /fhir/Patient/{id} - Read a patient
pub async fn read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: AuditContext,
) -> Result<Response, AppError> {
    let patient = state.service.read(&id).await?;
    state
        .auditor
        .record(AuditAction::Read, &id, patient.version(), &ctx)
        .await;

    Ok((version_headers(&patient), fhir_json(&patient)).into_response())
}

/// PUT /fhir/Patient/{id} - Replace a patient
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    ctx: AuditContext,
    body: Bytes,
) -> Result<Response, AppError> {
    let expected_version = parse_if_match(&headers)?;
    let updated = state
        .service
        .update(&id, parse_body(&body)?, expected_version)
        .await?;
    state
        .auditor
        .record(AuditAction::Update, &id, updated.version(), &ctx)
        .await;

    Ok((version_headers(&updated), fhir_json(&updated)).into_response())
}

/// DELETE /fhir/Patient/{id} - Delete a patient
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: AuditContext,
) -> Result<StatusCode, AppError> {
    state.service.delete(&id).await?;
    state
        .auditor
        .record(AuditAction::Delete, &id, None, &ctx)
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /fhir/Patient/{id}/$everything - Patient plus related resources
pub async fn everything(
    State(state): State<AppState>,
    Path(id): Path<String>,
    BaseUrl(base): BaseUrl,
    ctx: AuditContext,
) -> Result<Response, AppError> {
    let bundle = state.service.everything(&id, &base).await?;
    state
        .auditor
        .record(AuditAction::Read, &id, None, &ctx)
        .await;

    Ok(fhir_json(&bundle))
}

/// POST /fhir/Patient/$validate - Validate a patient without storing
pub async fn validate(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    state.service.validate(parse_body(&body)?)?;
    Ok(fhir_json(&OperationOutcome::success("Patient resource is valid")))
}
