//! Store interface for canonical records
//!
//! Contains the trait every storage backend implements plus the partial update
//! the corrector sends for targeted repairs.

use async_trait::async_trait;

use super::errors::StorageResult;
use super::record::{Availability, CanonicalRecord, RecordIdentifier};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert the record, or overwrite every field of the row with the same identifier.
    async fn upsert(&self, record: &CanonicalRecord) -> StorageResult<()>;

    /// All stored records ordered by identifier.
    async fn scan(&self) -> StorageResult<Vec<CanonicalRecord>>;

    /// Apply a partial update in place. The identifier never changes.
    async fn update_fields(&self, identifier: &RecordIdentifier, update: &FieldUpdate) -> StorageResult<()>;

    async fn find(&self, identifier: &RecordIdentifier) -> StorageResult<Option<CanonicalRecord>>;

    async fn count(&self) -> StorageResult<u64>;
}

/// Fields to overwrite; `None` leaves the stored value as is. For nullable
/// columns the inner option is the new value (`Some(None)` clears it).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    pub title: Option<String>,
    pub category: Option<Option<String>>,
    pub price: Option<Option<f64>>,
    pub rating: Option<Option<i64>>,
    pub availability: Option<Availability>,
    pub available_count: Option<i64>,
    pub description: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub detail_url: Option<Option<String>>,
}

impl FieldUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Names of the fields this update touches, for logging.
    pub fn touched_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("title");
        }
        if self.category.is_some() {
            fields.push("category");
        }
        if self.price.is_some() {
            fields.push("price");
        }
        if self.rating.is_some() {
            fields.push("rating");
        }
        if self.availability.is_some() {
            fields.push("availability");
        }
        if self.available_count.is_some() {
            fields.push("available_count");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.image_url.is_some() {
            fields.push("image_url");
        }
        if self.detail_url.is_some() {
            fields.push("detail_url");
        }
        fields
    }

    /// Apply to an in-memory record.
    pub fn apply_to(&self, record: &mut CanonicalRecord) {
        if let Some(title) = &self.title {
            record.title.clone_from(title);
        }
        if let Some(category) = &self.category {
            record.category.clone_from(category);
        }
        if let Some(price) = self.price {
            record.price = price;
        }
        if let Some(rating) = self.rating {
            record.rating = rating.filter(|r| CanonicalRecord::is_valid_rating(*r));
        }
        if let Some(availability) = self.availability {
            record.availability = availability;
        }
        if let Some(count) = self.available_count {
            record.available_count = count;
        }
        if let Some(description) = &self.description {
            record.description.clone_from(description);
        }
        if let Some(image_url) = &self.image_url {
            record.image_url.clone_from(image_url);
        }
        if let Some(detail_url) = &self.detail_url {
            record.detail_url.clone_from(detail_url);
        }
    }
}
