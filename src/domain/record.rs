//! Raw and canonical book records
//!
//! `RawRecord` is what an extractor captured, untouched. `CanonicalRecord` is the
//! persisted unit produced by the normalizer and rewritten by the corrector.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::ValidationError;

/// A raw scalar as captured from the source: text, or a number when the
/// extractor already produced one (e.g. a rating of `3`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Text view used by the string-oriented field parsers.
    pub fn as_text(&self) -> String {
        match self {
            Self::Integer(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// One item exactly as captured by a crawler or the HTML extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub title: Option<RawValue>,
    pub category: Option<RawValue>,
    pub price: Option<RawValue>,
    pub rating: Option<RawValue>,
    pub availability: Option<RawValue>,
    pub upc: Option<RawValue>,
    pub description: Option<RawValue>,
    pub image_url: Option<RawValue>,
    #[serde(alias = "product_page_url")]
    pub detail_url: Option<RawValue>,
}

impl RawRecord {
    pub fn with_title(mut self, value: impl Into<RawValue>) -> Self {
        self.title = Some(value.into());
        self
    }

    pub fn with_category(mut self, value: impl Into<RawValue>) -> Self {
        self.category = Some(value.into());
        self
    }

    pub fn with_price(mut self, value: impl Into<RawValue>) -> Self {
        self.price = Some(value.into());
        self
    }

    pub fn with_rating(mut self, value: impl Into<RawValue>) -> Self {
        self.rating = Some(value.into());
        self
    }

    pub fn with_availability(mut self, value: impl Into<RawValue>) -> Self {
        self.availability = Some(value.into());
        self
    }

    pub fn with_upc(mut self, value: impl Into<RawValue>) -> Self {
        self.upc = Some(value.into());
        self
    }

    pub fn with_description(mut self, value: impl Into<RawValue>) -> Self {
        self.description = Some(value.into());
        self
    }

    pub fn with_image_url(mut self, value: impl Into<RawValue>) -> Self {
        self.image_url = Some(value.into());
        self
    }

    pub fn with_detail_url(mut self, value: impl Into<RawValue>) -> Self {
        self.detail_url = Some(value.into());
        self
    }
}

/// Stock status of a canonical record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    InStock,
    OutOfStock,
    #[default]
    Unknown,
}

impl Availability {
    /// Storage token; `Unknown` is stored as NULL.
    pub fn as_token(self) -> Option<&'static str> {
        match self {
            Self::InStock => Some("in_stock"),
            Self::OutOfStock => Some("out_of_stock"),
            Self::Unknown => None,
        }
    }

    /// Lenient decode of a stored token. Legacy rows may carry the
    /// human-readable form ("In stock ") instead of the token.
    pub fn from_stored(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::Unknown;
        };
        let normalized = value.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
            "in stock" => Self::InStock,
            "out of stock" => Self::OutOfStock,
            _ => Self::Unknown,
        }
    }

    pub fn is_in_stock(self) -> bool {
        matches!(self, Self::InStock)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token().unwrap_or("unknown"))
    }
}

/// Natural key of a canonical record: BLAKE3 hex digest of its absolute detail URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordIdentifier(String);

impl RecordIdentifier {
    pub const HEX_LEN: usize = 64;

    /// Derive the identifier from a canonical absolute URL.
    pub fn from_url(url: &str) -> Self {
        Self(blake3::hash(url.as_bytes()).to_hex().to_string())
    }

    /// Validate an identifier received from outside the normalizer.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingIdentifier);
        }
        let well_formed = value.len() == Self::HEX_LEN
            && value.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(ValidationError::MalformedIdentifier {
                identifier: value.to_string(),
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecordIdentifier {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RecordIdentifier> for String {
    fn from(value: RecordIdentifier) -> Self {
        value.0
    }
}

impl AsRef<str> for RecordIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The persisted unit.
///
/// `rating` is kept as a plain integer so that rows written by older runs can be
/// read back and repaired; the store and the corrector keep it within 1..=5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub identifier: RecordIdentifier,
    pub title: String,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub rating: Option<i64>,
    pub availability: Availability,
    pub available_count: i64,
    pub upc: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub detail_url: Option<String>,
}

impl CanonicalRecord {
    pub const MIN_RATING: i64 = 1;
    pub const MAX_RATING: i64 = 5;

    pub fn is_valid_rating(rating: i64) -> bool {
        (Self::MIN_RATING..=Self::MAX_RATING).contains(&rating)
    }

    /// Rating with out-of-range values cleared.
    pub fn valid_rating(&self) -> Option<i64> {
        self.rating.filter(|r| Self::is_valid_rating(*r))
    }

    /// Available count with the out-of-stock invariant applied.
    pub fn effective_available_count(&self) -> i64 {
        if self.availability.is_in_stock() {
            self.available_count.max(0)
        } else {
            0
        }
    }
}

/// Re-serialize a canonical record to raw form. Normalizing the result yields
/// the original record again.
impl From<&CanonicalRecord> for RawRecord {
    fn from(record: &CanonicalRecord) -> Self {
        let availability = match record.availability {
            Availability::InStock => Some(RawValue::Text(format!(
                "In stock ({} available)",
                record.available_count
            ))),
            Availability::OutOfStock => Some(RawValue::Text("Out of stock".to_string())),
            Availability::Unknown => None,
        };

        Self {
            title: Some(RawValue::Text(record.title.clone())),
            category: record.category.clone().map(RawValue::Text),
            price: record.price.map(|p| RawValue::Text(format!("{p:.2}"))),
            rating: record.rating.map(RawValue::Integer),
            availability,
            upc: record.upc.clone().map(RawValue::Text),
            description: record.description.clone().map(RawValue::Text),
            image_url: record.image_url.clone().map(RawValue::Text),
            detail_url: record.detail_url.clone().map(RawValue::Text),
        }
    }
}
