//! Field parsers and the record normalizer
//!
//! Every parser here is total: malformed input resolves to `None` or
//! `Availability::Unknown`, never to an error or a panic.

pub mod availability;
pub mod description;
pub mod links;
pub mod normalizer;
pub mod price;
pub mod rating;
pub mod text;

pub use availability::{IndeterminateStockPolicy, parse_availability};
pub use description::DescriptionCleaner;
pub use links::{UrlRepair, is_absolute_http_url, resolve_url};
pub use normalizer::RecordNormalizer;
pub use price::{parse_price, round_price};
pub use rating::{RatingParser, RatingVocabulary};
pub use text::collapse_whitespace;
