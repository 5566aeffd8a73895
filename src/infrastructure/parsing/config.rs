//! Parsing configuration for HTML extraction
//!
//! CSS selectors per field, tried in order until one yields a value.

use serde::{Deserialize, Serialize};

/// Main parsing configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    pub book_page_selectors: BookPageSelectors,
}

/// CSS selectors for book detail pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookPageSelectors {
    pub title: Vec<String>,
    /// Third breadcrumb entry (Home / Books / <category>)
    pub category: Vec<String>,
    pub price: Vec<String>,
    /// Element whose `class` attribute carries the rating word
    pub rating: Vec<String>,
    /// All text nodes are joined
    pub availability: Vec<String>,
    pub description: Vec<String>,
    /// Element whose `src` attribute is the cover image
    pub image: Vec<String>,
    /// Rows of the product information table (`th` label, `td` value)
    pub info_rows: Vec<String>,
}

impl Default for BookPageSelectors {
    fn default() -> Self {
        Self {
            title: vec![".product_main h1".to_string(), "h1".to_string()],
            category: vec![
                "ul.breadcrumb li:nth-child(3) a".to_string(),
                ".breadcrumb li:nth-child(3) a".to_string(),
            ],
            price: vec![".product_main p.price_color".to_string(), "p.price_color".to_string()],
            rating: vec![".product_main p.star-rating".to_string(), "p.star-rating".to_string()],
            availability: vec![
                ".product_main p.instock.availability".to_string(),
                "p.instock.availability".to_string(),
                "p.availability".to_string(),
            ],
            description: vec!["#product_description ~ p".to_string()],
            image: vec![".item.active img".to_string(), "#product_gallery img".to_string()],
            info_rows: vec!["table.table-striped tr".to_string(), "table tr".to_string()],
        }
    }
}
