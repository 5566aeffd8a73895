//! Availability blurbs → stock status and count
//!
//! Scraped availability text is often the same phrase repeated around a
//! parenthetical count: `"In stock (9 available) In stock In stock"`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::text::collapse_whitespace;
use crate::domain::Availability;

static COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(?\s*(\d+)\s+available").expect("valid count pattern"));

static IN_STOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)in\s*stock").expect("valid in-stock pattern"));

static OUT_OF_STOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(out\s*of\s*stock|sold\s*out|unavailable)\b").expect("valid out-of-stock pattern")
});

/// How to classify non-empty text that never says "in stock".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndeterminateStockPolicy {
    /// Anything that is not "in stock" is out of stock.
    #[default]
    OutOfStock,
    /// Only explicit out-of-stock wording counts; garbled text stays unknown.
    Unknown,
}

/// Parse availability text into a status and a non-negative count.
///
/// The count is 0 unless the status is `InStock`.
pub fn parse_availability(raw: &str, policy: IndeterminateStockPolicy) -> (Availability, u32) {
    let text = collapse_whitespace(raw);
    if text.is_empty() {
        return (Availability::Unknown, 0);
    }

    let count = COUNT_RE
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());

    let status = if IN_STOCK_RE.is_match(&text) {
        Availability::InStock
    } else {
        match policy {
            IndeterminateStockPolicy::OutOfStock => Availability::OutOfStock,
            IndeterminateStockPolicy::Unknown if OUT_OF_STOCK_RE.is_match(&text) => {
                Availability::OutOfStock
            }
            IndeterminateStockPolicy::Unknown => Availability::Unknown,
        }
    };

    match status {
        Availability::InStock => (status, count.unwrap_or(0)),
        Availability::OutOfStock | Availability::Unknown => (status, 0),
    }
}
