//! RawRecord → CanonicalRecord
//!
//! The normalizer owns the immutable lookup tables its field parsers need and
//! is shared read-only across worker threads.

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::debug;

use super::availability::{IndeterminateStockPolicy, parse_availability};
use super::description::DescriptionCleaner;
use super::links::{UrlRepair, is_absolute_http_url, resolve_url};
use super::price::{parse_price, round_price};
use super::rating::RatingParser;
use super::text::{collapse_whitespace, non_empty_collapsed};
use crate::domain::{Availability, CanonicalRecord, RawRecord, RawValue, RecordIdentifier, ValidationError};
use crate::infrastructure::config::{NormalizationConfig, defaults};

#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    default_base_url: String,
    rating: RatingParser,
    description: DescriptionCleaner,
    stock_policy: IndeterminateStockPolicy,
    url_repair: UrlRepair,
}

impl RecordNormalizer {
    pub fn new(config: &NormalizationConfig) -> Result<Self> {
        let rating = RatingParser::new(&config.rating_words).context("Invalid rating vocabulary")?;
        Ok(Self {
            default_base_url: config.base_url.clone(),
            rating,
            description: DescriptionCleaner::new(config.description_max_len),
            stock_policy: config.indeterminate_availability,
            url_repair: UrlRepair::new(&defaults::url_segment_fixes()),
        })
    }

    /// Replace the URL repair applied to resolved links. Pass the corrector's
    /// table so stored URLs are already in their corrected form.
    pub fn with_url_repair(mut self, url_repair: UrlRepair) -> Self {
        self.url_repair = url_repair;
        self
    }

    pub fn default_base_url(&self) -> &str {
        &self.default_base_url
    }

    /// Normalize one raw record. `base_url` falls back to the configured site
    /// root when absent or blank.
    pub fn normalize(&self, raw: &RawRecord, base_url: Option<&str>) -> Result<CanonicalRecord, ValidationError> {
        let base = base_url
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(&self.default_base_url);

        let detail_url = raw
            .detail_url
            .as_ref()
            .and_then(|v| resolve_url(&v.as_text(), base))
            .map(|url| self.url_repair.repair(&url))
            .ok_or(ValidationError::MissingDetailUrl)?;

        if !is_absolute_http_url(&detail_url) {
            return Err(ValidationError::UnresolvableDetailUrl {
                url: detail_url,
                reason: format!("not an absolute http(s) URL after joining with '{base}'"),
            });
        }

        let (availability, count) = raw
            .availability
            .as_ref()
            .map_or((Availability::Unknown, 0), |v| {
                parse_availability(&v.as_text(), self.stock_policy)
            });

        let record = CanonicalRecord {
            identifier: RecordIdentifier::from_url(&detail_url),
            title: raw
                .title
                .as_ref()
                .map(|v| collapse_whitespace(&v.as_text()))
                .unwrap_or_default(),
            category: raw.category.as_ref().and_then(|v| non_empty_collapsed(&v.as_text())),
            price: raw.price.as_ref().and_then(canonical_price),
            rating: raw.rating.as_ref().and_then(|v| self.rating.parse(v)).map(i64::from),
            availability,
            available_count: i64::from(count),
            upc: raw.upc.as_ref().and_then(|v| {
                let upc = v.as_text().trim().to_string();
                (!upc.is_empty()).then_some(upc)
            }),
            description: raw.description.as_ref().and_then(|v| self.description.clean(&v.as_text())),
            image_url: raw
                .image_url
                .as_ref()
                .and_then(|v| resolve_url(&v.as_text(), base))
                .map(|url| self.url_repair.repair(&url)),
            detail_url: Some(detail_url),
        };

        debug!("Normalized record {} ({})", record.identifier, record.title);
        Ok(record)
    }

    /// Normalize a batch in parallel. Results keep the input order.
    pub fn normalize_batch(
        &self,
        raws: &[RawRecord],
        base_url: Option<&str>,
    ) -> Vec<Result<CanonicalRecord, ValidationError>> {
        raws.par_iter().map(|raw| self.normalize(raw, base_url)).collect()
    }
}

fn canonical_price(value: &RawValue) -> Option<f64> {
    let price = parse_price(&value.as_text())?;
    if price < 0.0 {
        return None;
    }
    let rounded = round_price(price);
    // -0.0 would serialize differently from 0.0
    Some(if rounded == 0.0 { 0.0 } else { rounded })
}
