//! HTML extraction for book detail pages
//!
//! Extractors only capture raw values; the normalizer does all cleaning.

pub mod book_page_parser;
pub mod config;
pub mod context;
pub mod error;

// Re-export public types
pub use book_page_parser::BookPageParser;
pub use config::{BookPageSelectors, ParsingConfig};
pub use context::PageContext;
pub use error::{ParsingError, ParsingResult};

use scraper::Html;

/// Parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;

    /// Parse a raw document string
    fn parse_document(&self, html: &str, context: &Self::Context) -> ParsingResult<Self::Output> {
        let document = Html::parse_document(html);
        self.parse_with_context(&document, context)
    }
}
