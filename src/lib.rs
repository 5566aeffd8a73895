//! Book Catalog - extraction, normalization and upsert pipeline
//!
//! Turns scraped book product pages into canonical records, stores them in
//! SQLite keyed by their detail URL, and repairs known data defects after load.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod normalization;
