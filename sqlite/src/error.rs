//! Error types for bookstore storage operations.
//!
//! Provides a unified error type covering bootstrap, database access,
//! configuration, and price validation failures.

use madang_core::InvalidPrice;
use thiserror::Error;

/// Errors that can occur while opening or using the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A reference data source is missing or malformed. Fatal at open.
    #[error("bootstrap error: {0}")]
    BootstrapError(String),

    /// SQLite failure: malformed SQL, bad parameters, or a constraint violation.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// A mutating statement was passed to the read-only query service.
    #[error("statement is not read-only: {0}")]
    ReadOnlyViolation(String),

    /// The price input is not a whole number. Nothing was written.
    #[error(transparent)]
    InvalidPrice(#[from] InvalidPrice),

    /// Configuration values are inconsistent or unusable.
    #[error("config error: {0}")]
    ConfigError(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl StoreError {
    /// Returns `true` for failures the user can fix by re-entering input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::InvalidPrice(_))
    }
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
