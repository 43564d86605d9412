//! Patient resource service.
//!
//! Orchestrates validation, the record mapping, the store and the bundle
//! builder for each interaction. Writes go through `Expected` so a stale
//! read-then-write is rejected by the store instead of overwriting.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::bundle::{self, Bundle};
use crate::error::FhirError;
use crate::patient::PatientResource;
use crate::record::{self, PatientRecord};
use crate::search::SearchParams;
use crate::seed;
use crate::store::{Expected, PatientStore};
use crate::validation;

/// Storage keeps microsecond precision; truncate so reads equal writes.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn not_found(id: &str) -> FhirError {
    FhirError::NotFound(format!("Patient with id '{}' not found", id))
}

#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn PatientStore>,
    max_page_size: Option<usize>,
}

impl PatientService {
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        Self {
            store,
            max_page_size: None,
        }
    }

    /// Upper bound applied to `_count`
    pub fn with_max_page_size(mut self, max: usize) -> Self {
        self.max_page_size = Some(max);
        self
    }

    pub fn store(&self) -> &Arc<dyn PatientStore> {
        &self.store
    }

    /// Type-level search. An empty result is still a Bundle.
    pub async fn search(&self, params: SearchParams, base_url: &str) -> Result<Bundle, FhirError> {
        let params = params.capped(self.max_page_size);
        let page = self
            .store
            .query(&params.filter, params.offset, params.count)
            .await?;

        tracing::debug!(
            total = page.total,
            returned = page.records.len(),
            offset = params.offset,
            count = params.count,
            unfiltered = params.filter.is_empty(),
            "Patient search"
        );

        let resources: Vec<PatientResource> = page.records.iter().map(record::to_public).collect();
        bundle::build_search_bundle(&resources, page.total, &params, base_url)
    }

    /// Read the stored record
    pub async fn read_record(&self, id: &str) -> Result<PatientRecord, FhirError> {
        self.store.get(id).await?.ok_or_else(|| not_found(id))
    }

    pub async fn read(&self, id: &str) -> Result<PatientResource, FhirError> {
        Ok(self.read_record(id).await?.to_public())
    }

    /// Create a patient at version 1. A supplied id is kept if it is unused.
    pub async fn create(&self, payload: JsonValue) -> Result<PatientResource, FhirError> {
        let resource = validation::parse_patient(payload)?;

        let id = match resource.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => {
                if let Some(violation) = validation::validate_id(id) {
                    return Err(FhirError::invalid(violation));
                }
                id.to_string()
            }
            None => Uuid::new_v4().to_string(),
        };

        let timestamp = now();
        let record = PatientRecord {
            id,
            version: 1,
            created_at: timestamp,
            updated_at: Some(timestamp),
            fields: record::to_fields(&resource),
        };

        self.store.put(record.clone(), Expected::Absent).await?;
        tracing::info!(patient_id = %record.id, version = record.version, "Patient created");

        Ok(record.to_public())
    }

    /// Full-replace update.
    ///
    /// `expected_version` comes from the caller (If-Match); when given it must
    /// equal the stored version. The write itself is guarded by the version
    /// that was read, so a concurrent update surfaces as a conflict.
    pub async fn update(
        &self,
        id: &str,
        payload: JsonValue,
        expected_version: Option<i32>,
    ) -> Result<PatientResource, FhirError> {
        let existing = self.read_record(id).await?;

        if let Some(expected) = expected_version {
            if expected != existing.version {
                return Err(FhirError::PreconditionFailed(format!(
                    "Patient/{} is at version {}, not {}",
                    id, existing.version, expected
                )));
            }
        }

        let body_id = payload.get("id").and_then(JsonValue::as_str);
        if body_id.is_some_and(|body_id| body_id != id) {
            let mut violations = vec!["Resource id in body must match id in URL".to_string()];
            violations.extend(validation::validate(&payload));
            return Err(FhirError::Invalid(violations));
        }

        let resource = validation::parse_patient(payload)?;
        let record = PatientRecord {
            id: existing.id.clone(),
            version: existing.version + 1,
            created_at: existing.created_at,
            updated_at: Some(now()),
            fields: record::to_fields(&resource),
        };

        self.store
            .put(record.clone(), Expected::Version(existing.version))
            .await?;
        tracing::info!(patient_id = %record.id, version = record.version, "Patient updated");

        Ok(record.to_public())
    }

    /// Hard delete. The id is retired and cannot be created again.
    pub async fn delete(&self, id: &str) -> Result<(), FhirError> {
        self.read_record(id).await?;

        if !self.store.delete(id).await? {
            return Err(not_found(id));
        }
        tracing::info!(patient_id = %id, "Patient deleted");

        Ok(())
    }

    /// `$everything`: the patient plus related resources (none yet)
    pub async fn everything(&self, id: &str, base_url: &str) -> Result<Bundle, FhirError> {
        let patient = self.read(id).await?;
        bundle::build_aggregate_bundle(&patient, &[], base_url)
    }

    /// `$validate`: run the create-time checks without storing
    pub fn validate(&self, payload: JsonValue) -> Result<(), FhirError> {
        validation::parse_patient(payload).map(|_| ())
    }

    /// Load the reference patients, skipping any that already exist
    pub async fn seed_reference_patients(&self) -> Result<usize, FhirError> {
        let mut created = 0;
        for patient in seed::reference_patients() {
            match self.create(patient).await {
                Ok(_) => created += 1,
                Err(FhirError::Conflict(msg)) => tracing::debug!(%msg, "Seed patient skipped"),
                Err(e) => return Err(e),
            }
        }
        tracing::info!(count = created, "Seeded reference patients");
        Ok(created)
    }
}
