//! Book detail page parser
//!
//! Captures one `RawRecord` per product page. Every field is optional except
//! the title; values are returned exactly as they appear in the markup.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::config::{BookPageSelectors, ParsingConfig};
use super::context::PageContext;
use super::{ContextualParser, ParsingError, ParsingResult};
use crate::domain::{RawRecord, RawValue};

/// Row label of the UPC in the product information table
const UPC_LABEL: &str = "UPC";

pub struct BookPageParser {
    title_selectors: Vec<Selector>,
    category_selectors: Vec<Selector>,
    price_selectors: Vec<Selector>,
    rating_selectors: Vec<Selector>,
    availability_selectors: Vec<Selector>,
    description_selectors: Vec<Selector>,
    image_selectors: Vec<Selector>,
    info_row_selectors: Vec<Selector>,
    th_selector: Selector,
    td_selector: Selector,
}

impl BookPageParser {
    /// Create a new parser with default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&ParsingConfig::default().book_page_selectors)
    }

    /// Create parser with custom selector configuration
    pub fn with_config(selectors: &BookPageSelectors) -> ParsingResult<Self> {
        Ok(Self {
            title_selectors: Self::compile_selectors("title", &selectors.title)?,
            category_selectors: Self::compile_selectors("category", &selectors.category)?,
            price_selectors: Self::compile_selectors("price", &selectors.price)?,
            rating_selectors: Self::compile_selectors("rating", &selectors.rating)?,
            availability_selectors: Self::compile_selectors("availability", &selectors.availability)?,
            description_selectors: Self::compile_selectors("description", &selectors.description)?,
            image_selectors: Self::compile_selectors("image", &selectors.image)?,
            info_row_selectors: Self::compile_selectors("info_rows", &selectors.info_rows)?,
            th_selector: Self::compile_one("th")?,
            td_selector: Self::compile_one("td")?,
        })
    }

    /// Compile selector strings, skipping invalid ones; at least one must survive
    fn compile_selectors(field: &str, selector_strings: &[String]) -> ParsingResult<Vec<Selector>> {
        let selectors: Vec<Selector> = selector_strings
            .iter()
            .filter_map(|s| match Selector::parse(s) {
                Ok(selector) => Some(selector),
                Err(e) => {
                    warn!("Failed to compile {} selector '{}': {}", field, s, e);
                    None
                }
            })
            .collect();

        if selectors.is_empty() {
            return Err(ParsingError::NoSelectors {
                field: field.to_string(),
            });
        }
        Ok(selectors)
    }

    fn compile_one(selector: &str) -> ParsingResult<Selector> {
        Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, &e.to_string()))
    }

    /// First non-blank text of the first matching selector
    fn first_text(html: &Html, selectors: &[Selector]) -> Option<String> {
        selectors.iter().find_map(|selector| {
            html.select(selector)
                .map(|element| element.text().collect::<String>())
                .find(|text| !text.trim().is_empty())
        })
    }

    /// All non-blank text nodes of the first matching element, joined by spaces
    fn joined_text(html: &Html, selectors: &[Selector]) -> Option<String> {
        selectors.iter().find_map(|selector| {
            let element = html.select(selector).next()?;
            let joined = element
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        })
    }

    fn first_attr(html: &Html, selectors: &[Selector], attr: &str) -> Option<String> {
        selectors.iter().find_map(|selector| {
            html.select(selector)
                .find_map(|element| element.value().attr(attr))
                .filter(|value| !value.trim().is_empty())
                .map(str::to_string)
        })
    }

    /// Value cell of the information table row labelled `label`
    fn info_value(&self, html: &Html, label: &str) -> Option<String> {
        self.info_row_selectors.iter().find_map(|selector| {
            html.select(selector).find_map(|row: ElementRef<'_>| {
                let th = row.select(&self.th_selector).next()?;
                if th.text().collect::<String>().trim() != label {
                    return None;
                }
                let td = row.select(&self.td_selector).next()?;
                Some(td.text().collect::<String>())
            })
        })
    }
}

impl ContextualParser for BookPageParser {
    type Output = RawRecord;
    type Context = PageContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        debug!("Parsing book page: {}", context.url);

        let title = Self::first_text(html, &self.title_selectors)
            .ok_or_else(|| ParsingError::required_field_missing("title", Some(&context.url)))?;

        let record = RawRecord {
            title: Some(RawValue::Text(title)),
            category: Self::first_text(html, &self.category_selectors).map(RawValue::Text),
            price: Self::first_text(html, &self.price_selectors).map(RawValue::Text),
            rating: Self::first_attr(html, &self.rating_selectors, "class").map(RawValue::Text),
            availability: Self::joined_text(html, &self.availability_selectors).map(RawValue::Text),
            upc: self.info_value(html, UPC_LABEL).map(RawValue::Text),
            description: Self::first_text(html, &self.description_selectors).map(RawValue::Text),
            image_url: Self::first_attr(html, &self.image_selectors, "src").map(RawValue::Text),
            detail_url: Some(RawValue::Text(context.url.clone())),
        };

        Ok(record)
    }
}
