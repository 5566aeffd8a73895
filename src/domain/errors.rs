//! Record-level and storage-level error types
//!
//! Field-level parse failures are not errors: every field parser resolves them
//! to its unknown sentinel. What remains are records that cannot be keyed
//! and storage operations that fail.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Record has no identifier")]
    MissingIdentifier,

    #[error("Record has no detail URL to derive an identifier from")]
    MissingDetailUrl,

    #[error("Detail URL cannot be resolved to an absolute URL: {url} - {reason}")]
    UnresolvableDetailUrl { url: String, reason: String },

    #[error("Malformed identifier: '{identifier}'")]
    MalformedIdentifier { identifier: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {identifier}")]
    NotFound { identifier: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StorageError {
    pub fn not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            identifier: identifier.into(),
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) => true,
            Self::Database(sqlx::Error::Database(db)) => {
                // SQLITE_BUSY / SQLITE_LOCKED
                matches!(db.code().as_deref(), Some("5" | "6"))
            }
            Self::Database(_) | Self::NotFound { .. } | Self::Validation(_) => false,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
