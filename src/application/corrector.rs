//! Post-ingestion corrector
//!
//! Repairs rows already in the store (misspelled categories, broken URLs,
//! out-of-range ratings, stray whitespace) and reports on the result. A second
//! run over its own output changes nothing. Rows are never deleted.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{CanonicalRecord, FieldUpdate, RecordStore, StorageResult};
use crate::infrastructure::config::CorrectionConfig;
use crate::normalization::{UrlRepair, collapse_whitespace, round_price};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorrectionTableError {
    #[error("Empty category key in correction table")]
    EmptyCategoryKey,

    #[error("Category correction '{from}' -> '{to}' targets another misspelling")]
    ChainedCategoryFix { from: String, to: String },

    #[error("Empty URL pattern in correction table")]
    EmptyUrlPattern,

    #[error("URL replacement '{replacement}' reintroduces pattern '{pattern}'")]
    ReintroducedUrlPattern { pattern: String, replacement: String },
}

/// Immutable lookup tables used by the corrector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionTables {
    category_fixes: BTreeMap<String, String>,
    url_repair: UrlRepair,
}

impl CorrectionTables {
    /// Keys and targets are whitespace-collapsed before validation.
    pub fn new(
        category_fixes: &BTreeMap<String, String>,
        url_segment_fixes: &[(String, String)],
    ) -> Result<Self, CorrectionTableError> {
        let mut categories = BTreeMap::new();
        for (from, to) in category_fixes {
            let from = collapse_whitespace(from);
            if from.is_empty() {
                return Err(CorrectionTableError::EmptyCategoryKey);
            }
            categories.insert(from, collapse_whitespace(to));
        }

        if let Some((from, to)) = categories.iter().find(|(_, to)| categories.contains_key(*to)) {
            return Err(CorrectionTableError::ChainedCategoryFix {
                from: from.clone(),
                to: to.clone(),
            });
        }

        for (pattern, _) in url_segment_fixes {
            if pattern.is_empty() {
                return Err(CorrectionTableError::EmptyUrlPattern);
            }
        }
        for (_, replacement) in url_segment_fixes {
            if let Some((pattern, _)) = url_segment_fixes.iter().find(|(p, _)| replacement.contains(p.as_str())) {
                return Err(CorrectionTableError::ReintroducedUrlPattern {
                    pattern: pattern.clone(),
                    replacement: replacement.clone(),
                });
            }
        }

        Ok(Self {
            category_fixes: categories,
            url_repair: UrlRepair::new(url_segment_fixes),
        })
    }

    /// Collapse whitespace, then apply the misspelling table. Empty → `None`.
    pub fn fix_category(&self, category: &str) -> Option<String> {
        let collapsed = collapse_whitespace(category);
        if collapsed.is_empty() {
            return None;
        }
        Some(self.category_fixes.get(&collapsed).cloned().unwrap_or(collapsed))
    }

    /// Repair URL defects; well-formed URLs come back unchanged.
    pub fn fix_url(&self, url: &str) -> String {
        self.url_repair.repair(url)
    }

    pub fn url_repair(&self) -> &UrlRepair {
        &self.url_repair
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub count: usize,
    /// Mean of known prices, rounded to 2 digits
    pub average_price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionReport {
    pub total_records: usize,
    /// Records whose detail URL is missing or lacks the expected prefix
    pub bad_url_records: usize,
    pub changed_records: usize,
    pub top_categories: Vec<CategorySummary>,
}

pub struct PostIngestionCorrector {
    tables: CorrectionTables,
    expected_url_prefix: String,
    top_categories: usize,
}

impl PostIngestionCorrector {
    pub fn new(tables: CorrectionTables, expected_url_prefix: impl Into<String>, top_categories: usize) -> Self {
        Self {
            tables,
            expected_url_prefix: expected_url_prefix.into(),
            top_categories,
        }
    }

    pub fn from_config(config: &CorrectionConfig) -> Result<Self, CorrectionTableError> {
        let tables = CorrectionTables::new(&config.category_fixes, &config.url_segment_fixes)?;
        Ok(Self::new(tables, config.expected_url_prefix.clone(), config.top_categories))
    }

    /// Repair every stored record, then report on the corrected store.
    pub async fn run<S: RecordStore + ?Sized>(&self, store: &S) -> StorageResult<CorrectionReport> {
        let mut records = store.scan().await?;
        info!("Correcting {} stored records", records.len());

        let mut changed = 0;
        for record in &mut records {
            let update = self.correct_record(record);
            if update.is_empty() {
                continue;
            }
            debug!("Correcting {}: {}", record.identifier, update.touched_fields().join(", "));
            store.update_fields(&record.identifier, &update).await?;
            update.apply_to(record);
            changed += 1;
        }

        let report = self.build_report(&records, changed);
        info!(
            "Correction finished: total={}, changed={}, bad_urls={}",
            report.total_records, report.changed_records, report.bad_url_records
        );
        Ok(report)
    }

    /// Report on the store as it is, without writing.
    pub async fn summarize<S: RecordStore + ?Sized>(&self, store: &S) -> StorageResult<CorrectionReport> {
        let records = store.scan().await?;
        Ok(self.build_report(&records, 0))
    }

    /// Fields of `record` that need repair; empty when it is already clean.
    pub fn correct_record(&self, record: &CanonicalRecord) -> FieldUpdate {
        let mut update = FieldUpdate::default();

        if let Some(price) = record.price {
            let corrected = (price.is_finite() && price >= 0.0).then(|| round_price(price));
            if corrected != Some(price) {
                update.price = Some(corrected);
            }
        }

        if let Some(category) = &record.category {
            let corrected = self.tables.fix_category(category);
            if corrected.as_ref() != Some(category) {
                update.category = Some(corrected);
            }
        }

        let title = record.title.trim();
        if title != record.title {
            update.title = Some(title.to_string());
        }

        if record.description.as_deref().is_some_and(|d| d.trim().is_empty()) {
            update.description = Some(None);
        }

        if record.available_count != record.effective_available_count() {
            update.available_count = Some(record.effective_available_count());
        }

        if let Some(url) = &record.detail_url {
            let fixed = self.tables.fix_url(url);
            if &fixed != url {
                update.detail_url = Some(Some(fixed));
            }
        }
        if let Some(url) = &record.image_url {
            let fixed = self.tables.fix_url(url);
            if &fixed != url {
                update.image_url = Some(Some(fixed));
            }
        }

        if record.rating.is_some() && record.valid_rating().is_none() {
            update.rating = Some(None);
        }

        update
    }

    fn build_report(&self, records: &[CanonicalRecord], changed_records: usize) -> CorrectionReport {
        let bad_url_records = records
            .iter()
            .filter(|r| {
                !r.detail_url
                    .as_deref()
                    .is_some_and(|url| url.starts_with(&self.expected_url_prefix))
            })
            .count();

        // category → (count, price sum, priced count)
        let mut groups: HashMap<&str, (usize, f64, usize)> = HashMap::new();
        for record in records {
            let Some(category) = record.category.as_deref() else {
                continue;
            };
            let entry = groups.entry(category).or_default();
            entry.0 += 1;
            if let Some(price) = record.price {
                entry.1 += price;
                entry.2 += 1;
            }
        }

        let mut top_categories: Vec<CategorySummary> = groups
            .into_iter()
            .map(|(category, (count, sum, priced))| CategorySummary {
                category: category.to_string(),
                count,
                average_price: (priced > 0).then(|| round_price(sum / priced as f64)),
            })
            .collect();
        top_categories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        top_categories.truncate(self.top_categories);

        CorrectionReport {
            total_records: records.len(),
            bad_url_records,
            changed_records,
            top_categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Availability, RecordIdentifier};
    use crate::infrastructure::InMemoryRecordStore;
    use rstest::rstest;

    fn corrector() -> PostIngestionCorrector {
        PostIngestionCorrector::from_config(&CorrectionConfig::default()).unwrap()
    }

    fn record(slug: &str) -> CanonicalRecord {
        let url = format!("https://books.toscrape.com/catalogue/{slug}/index.html");
        CanonicalRecord {
            identifier: RecordIdentifier::from_url(&url),
            title: "Soumission".to_string(),
            category: Some("Fiction".to_string()),
            price: Some(50.1),
            rating: Some(1),
            availability: Availability::InStock,
            available_count: 20,
            upc: None,
            description: None,
            image_url: None,
            detail_url: Some(url),
        }
    }

    #[rstest]
    #[case("https://books.toscrape.com/cataloge/x_1/index.html", "https://books.toscrape.com/catalogue/x_1/index.html")]
    #[case("https://books.toscrape.com//catalogue//x_1/index.html", "https://books.toscrape.com/catalogue/x_1/index.html")]
    #[case("https://books.toscrape.com/catalogue%252Fx_1/index.html", "https://books.toscrape.com/catalogue/x_1/index.html")]
    #[case("https://books.toscrape.com/catalogue/x_1/index.html", "https://books.toscrape.com/catalogue/x_1/index.html")]
    #[case("https:///books.toscrape.com/a", "https://books.toscrape.com/a")]
    fn repairs_urls(#[case] url: &str, #[case] expected: &str) {
        let fixed = corrector().tables.fix_url(url);
        assert_eq!(fixed, expected);
        assert_eq!(corrector().tables.fix_url(&fixed), fixed);
    }

    #[rstest]
    #[case("Bsiness", Some("Business"))]
    #[case("  Adlt   Fiction ", Some("Adult Fiction"))]
    #[case("Food and Drink", Some("Food & Drink"))]
    #[case("Poetry", Some("Poetry"))]
    #[case("   ", None)]
    fn fixes_categories(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(corrector().tables.fix_category(raw).as_deref(), expected);
    }

    #[test]
    fn rejects_chained_category_fixes() {
        let mut fixes = BTreeMap::new();
        fixes.insert("Bsiness".to_string(), "Busines".to_string());
        fixes.insert("Busines".to_string(), "Business".to_string());
        assert!(matches!(
            CorrectionTables::new(&fixes, &[]),
            Err(CorrectionTableError::ChainedCategoryFix { .. })
        ));
    }

    #[test]
    fn rejects_self_reintroducing_url_fix() {
        let fixes = vec![("//".to_string(), "///".to_string())];
        assert!(matches!(
            CorrectionTables::new(&BTreeMap::new(), &fixes),
            Err(CorrectionTableError::ReintroducedUrlPattern { .. })
        ));
    }

    #[test]
    fn clean_record_needs_no_update() {
        assert!(corrector().correct_record(&record("clean_1")).is_empty());
    }

    #[test]
    fn dirty_record_is_fully_repaired() {
        let dirty = CanonicalRecord {
            title: "  Soumission ".to_string(),
            category: Some("Seqential  Art".to_string()),
            price: Some(50.104),
            rating: Some(0),
            availability: Availability::OutOfStock,
            available_count: 3,
            description: Some("   ".to_string()),
            image_url: Some("https://books.toscrape.com//media/a.jpg".to_string()),
            ..record("dirty_1")
        };

        let update = corrector().correct_record(&dirty);
        assert_eq!(update.title.as_deref(), Some("Soumission"));
        assert_eq!(update.category, Some(Some("Sequential Art".to_string())));
        assert_eq!(update.price, Some(Some(50.1)));
        assert_eq!(update.rating, Some(None));
        assert_eq!(update.available_count, Some(0));
        assert_eq!(update.description, Some(None));
        assert_eq!(update.image_url, Some(Some("https://books.toscrape.com/media/a.jpg".to_string())));
        assert_eq!(update.detail_url, None);

        let mut repaired = dirty.clone();
        update.apply_to(&mut repaired);
        assert!(corrector().correct_record(&repaired).is_empty());
    }

    #[test]
    fn negative_price_is_cleared() {
        let update = corrector().correct_record(&CanonicalRecord {
            price: Some(-1.0),
            ..record("neg_1")
        });
        assert_eq!(update.price, Some(None));
    }

    #[tokio::test]
    async fn second_run_changes_nothing() {
        let store = InMemoryRecordStore::new();
        store
            .insert_unchecked(CanonicalRecord {
                category: Some("Bsiness".to_string()),
                rating: Some(7),
                ..record("a_1")
            })
            .await;
        store.insert_unchecked(record("b_2")).await;

        let first = corrector().run(&store).await.unwrap();
        assert_eq!(first.total_records, 2);
        assert_eq!(first.changed_records, 1);

        let second = corrector().run(&store).await.unwrap();
        assert_eq!(second.changed_records, 0);
        assert_eq!(second.top_categories, first.top_categories);

        let records = store.scan().await.unwrap();
        assert!(records.iter().all(|r| r.rating.is_none_or(CanonicalRecord::is_valid_rating)));
        assert!(records.iter().any(|r| r.category.as_deref() == Some("Business")));
    }

    #[tokio::test]
    async fn report_counts_bad_urls_and_ranks_categories() {
        let store = InMemoryRecordStore::new();
        for (slug, category, price) in [
            ("p_1", "Poetry", Some(10.0)),
            ("p_2", "Poetry", Some(20.005)),
            ("h_1", "History", None),
            ("m_1", "Mystery", Some(5.0)),
        ] {
            store
                .insert_unchecked(CanonicalRecord {
                    category: Some(category.to_string()),
                    price,
                    ..record(slug)
                })
                .await;
        }
        store
            .insert_unchecked(CanonicalRecord {
                detail_url: Some("https://mirror.example.com/x.html".to_string()),
                category: None,
                ..record("elsewhere_1")
            })
            .await;

        let corrector = PostIngestionCorrector::new(
            CorrectionTables::new(&BTreeMap::new(), &[]).unwrap(),
            "https://books.toscrape.com/catalogue/",
            2,
        );
        let report = corrector.summarize(&store).await.unwrap();

        assert_eq!(report.total_records, 5);
        assert_eq!(report.bad_url_records, 1);
        assert_eq!(report.changed_records, 0);
        assert_eq!(
            report.top_categories,
            vec![
                CategorySummary {
                    category: "Poetry".to_string(),
                    count: 2,
                    average_price: Some(15.0),
                },
                CategorySummary {
                    category: "History".to_string(),
                    count: 1,
                    average_price: None,
                },
            ]
        );
    }
}
