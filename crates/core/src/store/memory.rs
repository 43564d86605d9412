use std::collections::HashSet;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;

use super::{Expected, PatientStore, QueryPage};
use crate::error::{StoreError, StoreResult};
use crate::record::PatientRecord;
use crate::search::{self, PatientFilter};

#[derive(Default)]
struct Inner {
    // Insertion order is the query order.
    records: IndexMap<String, PatientRecord>,
    retired: HashSet<String>,
}

/// Process-local patient store
#[derive(Default)]
pub struct InMemoryPatientStore {
    inner: RwLock<Inner>,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, id: &str) -> StoreResult<Option<PatientRecord>> {
        Ok(self.inner.read().records.get(id).cloned())
    }

    async fn put(&self, record: PatientRecord, expected: Expected) -> StoreResult<()> {
        let mut inner = self.inner.write();

        match expected {
            Expected::Absent => {
                if inner.records.contains_key(&record.id) || inner.retired.contains(&record.id) {
                    return Err(StoreError::AlreadyExists(record.id));
                }
            }
            Expected::Version(version) => {
                let actual = inner.records.get(&record.id).map(|r| r.version);
                if actual != Some(version) {
                    return Err(StoreError::VersionConflict {
                        id: record.id,
                        expected: version,
                        actual,
                    });
                }
            }
        }

        // Replacing an existing key keeps its position.
        inner.records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write();
        let existed = inner.records.shift_remove(id).is_some();
        if existed {
            inner.retired.insert(id.to_string());
        }
        Ok(existed)
    }

    async fn query(
        &self,
        filter: &PatientFilter,
        offset: usize,
        limit: usize,
    ) -> StoreResult<QueryPage> {
        let inner = self.inner.read();
        let (records, total) = search::apply(inner.records.values(), filter, offset, limit);
        Ok(QueryPage { records, total })
    }
}
