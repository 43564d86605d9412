//! patient-core: Patient registry domain
//!
//! This crate holds everything the HTTP layer needs that does not depend on
//! HTTP: the public Patient shape, its mapping to the flat stored record,
//! validation, search and paging, Bundle assembly, the store contract with an
//! in-memory backend, and the `PatientService` facade tying them together.

pub mod bundle;
pub mod capability;
pub mod error;
pub mod outcome;
pub mod patient;
pub mod record;
pub mod search;
pub mod seed;
pub mod service;
pub mod store;
pub mod validation;

pub use bundle::{Bundle, BundleEntry, BundleLink, BundleType};
pub use capability::CapabilityStatement;
pub use error::{FhirError, StoreError, StoreResult};
pub use outcome::{IssueSeverity, IssueType, OperationOutcome, OperationOutcomeIssue};
pub use patient::{BirthDate, Gender, PATIENT_RESOURCE_TYPE, PatientResource};
pub use record::{PatientFields, PatientRecord};
pub use search::{PatientFilter, SearchParams};
pub use service::PatientService;
pub use store::{Expected, InMemoryPatientStore, PatientStore, QueryPage};
