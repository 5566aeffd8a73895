//! Application layer module
//!
//! Use cases that orchestrate the normalizer and the store.

pub mod corrector;
pub mod ingestion;

pub use corrector::{
    CategorySummary, CorrectionReport, CorrectionTableError, CorrectionTables, PostIngestionCorrector,
};
pub use ingestion::{FailedWrite, IngestionService, IngestionSummary, RejectedRecord};
