//! # In-memory record store
//!
//! Same write semantics as the SQLite store, without a database file.
//! Used by tests and by dry runs.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::domain::{CanonicalRecord, FieldUpdate, RecordIdentifier, RecordStore, StorageError, StorageResult};

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<RecordIdentifier, CanonicalRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed rows exactly as given, bypassing write-time sanitizing.
    /// Lets tests reproduce rows left behind by older writers.
    pub async fn insert_unchecked(&self, record: CanonicalRecord) {
        self.records.write().await.insert(record.identifier.clone(), record);
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn upsert(&self, record: &CanonicalRecord) -> StorageResult<()> {
        let mut stored = record.clone();
        stored.rating = record.valid_rating();
        stored.available_count = record.effective_available_count();

        self.records.write().await.insert(stored.identifier.clone(), stored);
        Ok(())
    }

    async fn scan(&self) -> StorageResult<Vec<CanonicalRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn update_fields(&self, identifier: &RecordIdentifier, update: &FieldUpdate) -> StorageResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(identifier)
            .ok_or_else(|| StorageError::not_found(identifier.as_str()))?;

        update.apply_to(record);
        record.available_count = record.available_count.max(0);
        Ok(())
    }

    async fn find(&self, identifier: &RecordIdentifier) -> StorageResult<Option<CanonicalRecord>> {
        Ok(self.records.read().await.get(identifier).cloned())
    }

    async fn count(&self) -> StorageResult<u64> {
        Ok(self.records.read().await.len() as u64)
    }
}
