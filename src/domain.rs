//! Domain module - records, identifiers and the store interface
//!
//! Each module is its own file in the domain/ directory; commonly used items are
//! re-exported here.

pub mod errors;
pub mod record;
pub mod repositories;

pub use errors::{StorageError, StorageResult, ValidationError};
pub use record::{Availability, CanonicalRecord, RawRecord, RawValue, RecordIdentifier};
pub use repositories::{FieldUpdate, RecordStore};
