//! Error types for Stowage core.

use stowage_filter::FilterError;
use stowage_store::StoreError;
use stowage_value::ValueError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in dispatcher operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No handler is registered for the type name.
    #[error("no handler registered for data type '{data_type}'")]
    UnknownType {
        /// The requested type name.
        data_type: String,
    },

    /// A handler for the type name was registered twice.
    #[error("data type '{data_type}' is already registered")]
    DuplicateType {
        /// The type name.
        data_type: String,
    },

    /// A record body or key could not be bound to the registered type.
    #[error("binding failed: {message}")]
    Binding {
        /// Decoder message.
        message: String,
    },

    /// Filter, spec or paging input is malformed.
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// Storage engine or statement compilation error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Value conversion error.
    #[error("value error: {0}")]
    Value(#[from] ValueError),
}

impl CoreError {
    /// Create an unknown type error.
    pub fn unknown_type(data_type: impl Into<String>) -> Self {
        Self::UnknownType {
            data_type: data_type.into(),
        }
    }

    /// Create a binding error.
    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding {
            message: message.into(),
        }
    }

    /// Returns true if the request was rejected before reaching the
    /// storage engine.
    pub fn is_client_error(&self) -> bool {
        match self {
            CoreError::UnknownType { .. }
            | CoreError::Binding { .. }
            | CoreError::Filter(_)
            | CoreError::Value(_) => true,
            CoreError::Store(err) => err.is_invalid_request(),
            CoreError::DuplicateType { .. } => false,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::binding(err.to_string())
    }
}
