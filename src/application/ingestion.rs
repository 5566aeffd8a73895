//! Batch ingestion: normalize raw records and upsert them
//!
//! Normalization runs on the rayon pool; store writes run with bounded
//! concurrency. Writes that share an identifier run one after another in
//! input order, so the last occurrence in a batch is the one kept. A rejected
//! or failed record never aborts the batch.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::{CanonicalRecord, RawRecord, RecordStore};
use crate::normalization::RecordNormalizer;

/// Raw record refused by the normalizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Position in the submitted batch
    pub index: usize,
    pub reason: String,
}

/// Normalized record the store could not write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedWrite {
    pub index: usize,
    pub identifier: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub received: usize,
    pub stored: usize,
    pub rejected: Vec<RejectedRecord>,
    pub failed: Vec<FailedWrite>,
}

impl IngestionSummary {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.failed.is_empty()
    }
}

pub struct IngestionService<S: RecordStore + ?Sized> {
    store: Arc<S>,
    normalizer: Arc<RecordNormalizer>,
    db_max_concurrency: usize,
}

impl<S: RecordStore + ?Sized> IngestionService<S> {
    pub fn new(store: Arc<S>, normalizer: Arc<RecordNormalizer>, db_max_concurrency: usize) -> Self {
        Self {
            store,
            normalizer,
            db_max_concurrency: db_max_concurrency.max(1),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Normalize and store a batch. `base_url` overrides the configured site
    /// root for resolving relative links.
    pub async fn ingest(&self, raws: Vec<RawRecord>, base_url: Option<&str>) -> Result<IngestionSummary> {
        let received = raws.len();
        info!("Ingesting batch of {} raw records", received);

        let normalizer = Arc::clone(&self.normalizer);
        let base = base_url.map(str::to_string);
        let normalized = tokio::task::spawn_blocking(move || normalizer.normalize_batch(&raws, base.as_deref()))
            .await
            .context("Normalization task panicked")?;

        let mut summary = IngestionSummary {
            received,
            ..IngestionSummary::default()
        };

        let mut accepted: Vec<(usize, CanonicalRecord)> = Vec::with_capacity(normalized.len());
        for (index, result) in normalized.into_iter().enumerate() {
            match result {
                Ok(record) => accepted.push((index, record)),
                Err(e) => {
                    warn!("Rejected raw record #{}: {}", index, e);
                    summary.rejected.push(RejectedRecord {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let store = &*self.store;
        let outcomes: Vec<_> = stream::iter(group_by_identifier(accepted))
            .map(move |group| async move {
                let mut outcomes = Vec::with_capacity(group.len());
                for (index, record) in group {
                    let outcome = store.upsert(&record).await;
                    outcomes.push((index, record.identifier, outcome));
                }
                outcomes
            })
            .buffer_unordered(self.db_max_concurrency)
            .concat()
            .await;

        for (index, identifier, outcome) in outcomes {
            match outcome {
                Ok(()) => summary.stored += 1,
                Err(e) => {
                    error!("Failed to store record #{} ({}): {}", index, identifier, e);
                    summary.failed.push(FailedWrite {
                        index,
                        identifier: identifier.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        summary.failed.sort_by_key(|f| f.index);

        info!(
            "Ingestion finished: received={}, stored={}, rejected={}, failed={}",
            summary.received,
            summary.stored,
            summary.rejected.len(),
            summary.failed.len()
        );
        Ok(summary)
    }
}

/// Group records by identifier, keeping first-seen group order and input
/// order within each group.
fn group_by_identifier(accepted: Vec<(usize, CanonicalRecord)>) -> Vec<Vec<(usize, CanonicalRecord)>> {
    let mut groups: Vec<Vec<(usize, CanonicalRecord)>> = Vec::new();
    let mut slots: HashMap<crate::domain::RecordIdentifier, usize> = HashMap::new();
    for (index, record) in accepted {
        match slots.get(&record.identifier) {
            Some(&slot) => groups[slot].push((index, record)),
            None => {
                slots.insert(record.identifier.clone(), groups.len());
                groups.push(vec![(index, record)]);
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Availability, FieldUpdate, RecordIdentifier, StorageResult, ValidationError};
    use crate::infrastructure::InMemoryRecordStore;
    use crate::infrastructure::config::NormalizationConfig;
    use async_trait::async_trait;
    use std::time::Duration;

    /// In-memory store whose writes of records titled "first" are slow
    struct SlowFirstStore {
        inner: InMemoryRecordStore,
    }

    #[async_trait]
    impl RecordStore for SlowFirstStore {
        async fn upsert(&self, record: &CanonicalRecord) -> StorageResult<()> {
            if record.title == "first" {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.inner.upsert(record).await
        }

        async fn scan(&self) -> StorageResult<Vec<CanonicalRecord>> {
            self.inner.scan().await
        }

        async fn update_fields(&self, identifier: &RecordIdentifier, update: &FieldUpdate) -> StorageResult<()> {
            self.inner.update_fields(identifier, update).await
        }

        async fn find(&self, identifier: &RecordIdentifier) -> StorageResult<Option<CanonicalRecord>> {
            self.inner.find(identifier).await
        }

        async fn count(&self) -> StorageResult<u64> {
            self.inner.count().await
        }
    }

    fn service() -> IngestionService<InMemoryRecordStore> {
        let normalizer = RecordNormalizer::new(&NormalizationConfig::default()).unwrap();
        IngestionService::new(Arc::new(InMemoryRecordStore::new()), Arc::new(normalizer), 2)
    }

    fn raw(path: &str) -> RawRecord {
        RawRecord::default()
            .with_title("Tipping the Velvet")
            .with_price("£53.74")
            .with_rating("star-rating One")
            .with_availability("In stock (20 available)")
            .with_detail_url(path)
    }

    #[tokio::test]
    async fn bad_records_do_not_abort_the_batch() {
        let service = service();
        let batch = vec![
            raw("/catalogue/a/index.html"),
            RawRecord::default().with_title("no link"),
            raw("/catalogue/b/index.html"),
        ];

        let summary = service.ingest(batch, Some("https://example.com/")).await.unwrap();

        assert_eq!(summary.received, 3);
        assert_eq!(summary.stored, 2);
        assert_eq!(summary.rejected.len(), 1);
        assert_eq!(summary.rejected[0].index, 1);
        assert_eq!(summary.rejected[0].reason, ValidationError::MissingDetailUrl.to_string());
        assert!(summary.failed.is_empty());
        assert_eq!(service.store().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn reingesting_replaces_rows() {
        let service = service();
        service.ingest(vec![raw("/catalogue/a/index.html")], None).await.unwrap();

        let updated = raw("/catalogue/a/index.html").with_availability("Out of stock");
        let summary = service.ingest(vec![updated], None).await.unwrap();
        assert!(summary.is_clean());

        let id = RecordIdentifier::from_url("https://books.toscrape.com/catalogue/a/index.html");
        let stored = service.store().find(&id).await.unwrap().unwrap();
        assert_eq!(stored.availability, Availability::OutOfStock);
        assert_eq!(stored.available_count, 0);
        assert_eq!(service.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn last_duplicate_in_a_batch_wins() {
        let normalizer = RecordNormalizer::new(&NormalizationConfig::default()).unwrap();
        let store = Arc::new(SlowFirstStore {
            inner: InMemoryRecordStore::new(),
        });
        let service = IngestionService::new(Arc::clone(&store), Arc::new(normalizer), 4);

        let batch = vec![
            raw("/catalogue/a.html").with_title("first"),
            raw("/catalogue/b.html").with_title("other"),
            raw("/catalogue/a.html").with_title("second"),
        ];
        let summary = service.ingest(batch, None).await.unwrap();
        assert_eq!(summary.stored, 3);
        assert!(summary.is_clean());

        let all = store.scan().await.unwrap();
        assert_eq!(all.len(), 2);
        let id = RecordIdentifier::from_url("https://books.toscrape.com/catalogue/a.html");
        assert_eq!(store.find(&id).await.unwrap().unwrap().title, "second");
    }

    #[test]
    fn grouping_keeps_input_order_per_identifier() {
        let n = RecordNormalizer::new(&NormalizationConfig::default()).unwrap();
        let accepted: Vec<_> = ["/a.html", "/b.html", "/a.html", "/a.html"]
            .iter()
            .enumerate()
            .map(|(index, path)| (index, n.normalize(&raw(path), None).unwrap()))
            .collect();

        let groups = group_by_identifier(accepted);
        let indexes: Vec<Vec<usize>> = groups.iter().map(|g| g.iter().map(|(i, _)| *i).collect()).collect();
        assert_eq!(indexes, vec![vec![0, 2, 3], vec![1]]);
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let summary = service().ingest(Vec::new(), None).await.unwrap();
        assert_eq!(summary, IngestionSummary::default());
    }
}
