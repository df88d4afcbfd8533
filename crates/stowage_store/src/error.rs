//! Error types for storage operations.

use std::time::Duration;
use stowage_value::ValueError;
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to a storage engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The engine reported a failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// SQLite reported a failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A table, column or field name cannot be used as an identifier.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A filter or sort names a field the record type does not store.
    #[error("unknown column {column:?} in {table:?}")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Offending column path.
        column: String,
    },

    /// A record has fields the table has no column for.
    #[error("no column for {paths:?} in {table:?}")]
    Unstored {
        /// Table name.
        table: String,
        /// Projected paths without a column.
        paths: Vec<String>,
    },

    /// No pooled connection became available in time.
    #[error("timed out after {waited:?} waiting for a pooled connection")]
    PoolTimeout {
        /// How long the caller waited.
        waited: Duration,
    },

    /// A value could not be converted.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// The operation is not supported by this engine.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl StoreError {
    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Create an unsupported operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Create an unknown column error.
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Returns true if the error was raised before reaching the engine,
    /// i.e. the request itself is malformed.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidIdentifier(_)
                | StoreError::UnknownColumn { .. }
                | StoreError::Unstored { .. }
        )
    }
}
