//! Patient store contract.
//!
//! Backends provide keyed persistence with an optimistic-concurrency guard on
//! writes: `put` states what it expects to find and fails atomically when the
//! stored state differs.

mod memory;

pub use memory::InMemoryPatientStore;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::record::PatientRecord;
use crate::search::PatientFilter;

/// Expected state of the key being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// The id must never have been used (create)
    Absent,
    /// The stored record must currently be at this version (update)
    Version(i32),
}

/// One window of query results
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub records: Vec<PatientRecord>,
    /// Matching records before offset/limit are applied
    pub total: usize,
}

#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Short backend name for logs and health checks
    fn backend_name(&self) -> &'static str;

    async fn get(&self, id: &str) -> StoreResult<Option<PatientRecord>>;

    /// Insert or replace keyed by `record.id`, guarded by `expected`.
    ///
    /// # Errors
    ///
    /// * `StoreError::AlreadyExists` - `Expected::Absent` but the id is live or retired
    /// * `StoreError::VersionConflict` - `Expected::Version` does not match
    async fn put(&self, record: PatientRecord, expected: Expected) -> StoreResult<()>;

    /// Remove a record. Returns `false` if it did not exist.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Filter, count and window in a stable order
    async fn query(
        &self,
        filter: &PatientFilter,
        offset: usize,
        limit: usize,
    ) -> StoreResult<QueryPage>;

    /// Check the backend is reachable
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
