//! Error types for filters and paging parameters.

use thiserror::Error;

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors raised while decoding filters, filter specs or paging input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The filter document is not valid JSON for its shape.
    #[error("invalid filter: {message}")]
    InvalidFilter {
        /// Decoder message.
        message: String,
    },

    /// The filter spec list is not valid JSON for its shape.
    #[error("invalid filter spec: {message}")]
    InvalidSpec {
        /// Decoder message.
        message: String,
    },

    /// Offset or limit is missing or not a non-negative integer.
    #[error("invalid paging parameter '{name}': {value:?}")]
    InvalidPaging {
        /// Parameter name.
        name: &'static str,
        /// Raw parameter value.
        value: Option<String>,
    },

    /// A sort field is empty after removing the direction prefix.
    #[error("empty sort field")]
    EmptySortField,
}

impl FilterError {
    /// Create an invalid filter error.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
        }
    }

    /// Create an invalid spec error.
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
        }
    }

    /// Create an invalid paging error.
    pub fn invalid_paging(name: &'static str, value: Option<&str>) -> Self {
        Self::InvalidPaging {
            name,
            value: value.map(str::to_string),
        }
    }
}
