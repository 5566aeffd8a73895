//! SQLite-backed record store
//!
//! One row per identifier in the `books` table. Every write is a single
//! statement, so readers in WAL mode see either the old row or the new one.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, trace};

use crate::domain::{
    Availability, CanonicalRecord, FieldUpdate, RecordIdentifier, RecordStore, StorageError, StorageResult,
};

const SELECT_COLUMNS: &str = "SELECT identifier, title, category, price, rating, availability, \
     available_count, upc, description, image_url, detail_url FROM books";

pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Helper method to convert database row to a canonical record.
    ///
    /// Ratings are returned as stored so legacy out-of-range values reach the corrector.
    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> StorageResult<CanonicalRecord> {
        let identifier: String = row.try_get("identifier")?;
        let availability: Option<String> = row.try_get("availability")?;

        Ok(CanonicalRecord {
            identifier: RecordIdentifier::parse(&identifier)?,
            title: row.try_get("title")?,
            category: row.try_get("category")?,
            price: row.try_get("price")?,
            rating: row.try_get("rating")?,
            availability: Availability::from_stored(availability.as_deref()),
            available_count: row.try_get("available_count")?,
            upc: row.try_get("upc")?,
            description: row.try_get("description")?,
            image_url: row.try_get("image_url")?,
            detail_url: row.try_get("detail_url")?,
        })
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn upsert(&self, record: &CanonicalRecord) -> StorageResult<()> {
        sqlx::query(
            r"
            INSERT INTO books (
                identifier, title, category, price, rating, availability,
                available_count, upc, description, image_url, detail_url
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(identifier) DO UPDATE SET
                title = excluded.title,
                category = excluded.category,
                price = excluded.price,
                rating = excluded.rating,
                availability = excluded.availability,
                available_count = excluded.available_count,
                upc = excluded.upc,
                description = excluded.description,
                image_url = excluded.image_url,
                detail_url = excluded.detail_url
            ",
        )
        .bind(record.identifier.as_str())
        .bind(&record.title)
        .bind(&record.category)
        .bind(record.price)
        .bind(record.valid_rating())
        .bind(record.availability.as_token())
        .bind(record.effective_available_count())
        .bind(&record.upc)
        .bind(&record.description)
        .bind(&record.image_url)
        .bind(&record.detail_url)
        .execute(&self.pool)
        .await?;

        trace!("Upserted record {}", record.identifier);
        Ok(())
    }

    async fn scan(&self) -> StorageResult<Vec<CanonicalRecord>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY identifier"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn update_fields(&self, identifier: &RecordIdentifier, update: &FieldUpdate) -> StorageResult<()> {
        if update.is_empty() {
            return match self.find(identifier).await? {
                Some(_) => Ok(()),
                None => Err(StorageError::not_found(identifier.as_str())),
            };
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE books SET ");
        let mut set = builder.separated(", ");
        if let Some(title) = &update.title {
            set.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(category) = &update.category {
            set.push("category = ").push_bind_unseparated(category.clone());
        }
        if let Some(price) = update.price {
            set.push("price = ").push_bind_unseparated(price);
        }
        if let Some(rating) = update.rating {
            let rating = rating.filter(|r| CanonicalRecord::is_valid_rating(*r));
            set.push("rating = ").push_bind_unseparated(rating);
        }
        if let Some(availability) = update.availability {
            set.push("availability = ").push_bind_unseparated(availability.as_token());
        }
        if let Some(count) = update.available_count {
            set.push("available_count = ").push_bind_unseparated(count.max(0));
        }
        if let Some(description) = &update.description {
            set.push("description = ").push_bind_unseparated(description.clone());
        }
        if let Some(image_url) = &update.image_url {
            set.push("image_url = ").push_bind_unseparated(image_url.clone());
        }
        if let Some(detail_url) = &update.detail_url {
            set.push("detail_url = ").push_bind_unseparated(detail_url.clone());
        }
        builder.push(" WHERE identifier = ");
        builder.push_bind(identifier.as_str().to_string());

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(identifier.as_str()));
        }

        debug!("Updated {} on {}", update.touched_fields().join(", "), identifier);
        Ok(())
    }

    async fn find(&self, identifier: &RecordIdentifier) -> StorageResult<Option<CanonicalRecord>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE identifier = ?"))
            .bind(identifier.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn count(&self) -> StorageResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::DatabaseConnection;
    use anyhow::Result;
    use tempfile::{TempDir, tempdir};

    async fn store() -> Result<(TempDir, SqliteRecordStore)> {
        let dir = tempdir()?;
        let url = format!("sqlite:{}", dir.path().join("books.db").display());
        let db = DatabaseConnection::new(&url).await?;
        db.migrate().await?;
        Ok((dir, SqliteRecordStore::new(db.pool().clone())))
    }

    fn record(url: &str) -> CanonicalRecord {
        CanonicalRecord {
            identifier: RecordIdentifier::from_url(url),
            title: "A Light in the Attic".to_string(),
            category: Some("Poetry".to_string()),
            price: Some(51.77),
            rating: Some(3),
            availability: Availability::InStock,
            available_count: 22,
            upc: Some("a897fe39b1053632".to_string()),
            description: Some("It's hard to imagine a world without it.".to_string()),
            image_url: Some("https://books.toscrape.com/media/cache/fe/72/fe72.jpg".to_string()),
            detail_url: Some(url.to_string()),
        }
    }

    #[tokio::test]
    async fn upsert_twice_keeps_one_identical_row() -> Result<()> {
        let (_dir, store) = store().await?;
        let book = record("https://books.toscrape.com/catalogue/a_1/index.html");

        store.upsert(&book).await?;
        let first = store.scan().await?;
        store.upsert(&book).await?;
        let second = store.scan().await?;

        assert_eq!(store.count().await?, 1);
        assert_eq!(first, second);
        assert_eq!(second, vec![book]);
        Ok(())
    }

    #[tokio::test]
    async fn upsert_overwrites_every_field() -> Result<()> {
        let (_dir, store) = store().await?;
        let url = "https://books.toscrape.com/catalogue/a_1/index.html";
        store.upsert(&record(url)).await?;

        let replacement = CanonicalRecord {
            category: None,
            price: Some(10.0),
            rating: None,
            availability: Availability::OutOfStock,
            available_count: 0,
            description: None,
            ..record(url)
        };
        store.upsert(&replacement).await?;

        assert_eq!(store.find(&replacement.identifier).await?, Some(replacement));
        assert_eq!(store.count().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn write_sanitizes_rating_and_count() -> Result<()> {
        let (_dir, store) = store().await?;
        let book = CanonicalRecord {
            rating: Some(9),
            availability: Availability::OutOfStock,
            available_count: 4,
            ..record("https://books.toscrape.com/catalogue/b_2/index.html")
        };
        store.upsert(&book).await?;

        let stored = store.find(&book.identifier).await?.unwrap();
        assert_eq!(stored.rating, None);
        assert_eq!(stored.available_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn update_fields_touches_only_given_columns() -> Result<()> {
        let (_dir, store) = store().await?;
        let book = record("https://books.toscrape.com/catalogue/c_3/index.html");
        store.upsert(&book).await?;

        let update = FieldUpdate {
            category: Some(Some("Business".to_string())),
            description: Some(None),
            ..FieldUpdate::default()
        };
        store.update_fields(&book.identifier, &update).await?;

        let stored = store.find(&book.identifier).await?.unwrap();
        assert_eq!(stored.category.as_deref(), Some("Business"));
        assert_eq!(stored.description, None);
        assert_eq!(stored.title, book.title);
        assert_eq!(stored.price, book.price);
        Ok(())
    }

    #[tokio::test]
    async fn missing_rows_are_reported() -> Result<()> {
        let (_dir, store) = store().await?;
        let missing = RecordIdentifier::from_url("https://books.toscrape.com/catalogue/none/index.html");

        assert_eq!(store.find(&missing).await?, None);

        let update = FieldUpdate {
            title: Some("x".to_string()),
            ..FieldUpdate::default()
        };
        let err = store.update_fields(&missing, &update).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));

        let err = store.update_fields(&missing, &FieldUpdate::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn legacy_rows_are_read_leniently() -> Result<()> {
        let (_dir, store) = store().await?;
        let identifier = RecordIdentifier::from_url("https://books.toscrape.com/catalogue/d_4/index.html");
        sqlx::query(
            "INSERT INTO books (identifier, rating, availability, available_count) VALUES (?, 0, ' In stock ', 3)",
        )
        .bind(identifier.as_str())
        .execute(store.pool())
        .await?;

        let stored = store.find(&identifier).await?.unwrap();
        assert_eq!(stored.title, "");
        assert_eq!(stored.rating, Some(0));
        assert_eq!(stored.availability, Availability::InStock);
        assert_eq!(stored.available_count, 3);
        Ok(())
    }
}
