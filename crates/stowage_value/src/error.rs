//! Error types for the value crate.

use std::fmt::Display;
use thiserror::Error;

/// Result type for value operations.
pub type ValueResult<T> = Result<T, ValueError>;

/// Errors that can occur while converting to or from [`crate::Value`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// Failed to turn a Rust value into a [`crate::Value`].
    #[error("serialization failed: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
    },

    /// Failed to turn a [`crate::Value`] back into a Rust value.
    #[error("deserialization failed: {message}")]
    Deserialization {
        /// Description of the deserialization error.
        message: String,
    },

    /// Unsigned integer does not fit the signed 64-bit range.
    #[error("integer overflow")]
    IntegerOverflow,

    /// Text could not be parsed as a timestamp.
    #[error("invalid timestamp: {text}")]
    InvalidTimestamp {
        /// The offending text.
        text: String,
    },

    /// Unsupported Rust type.
    #[error("unsupported type: {type_name}")]
    UnsupportedType {
        /// Name of the unsupported type.
        type_name: String,
    },
}

impl ValueError {
    /// Create a serialization failed error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a deserialization failed error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization {
            message: message.into(),
        }
    }

    /// Create an invalid timestamp error.
    pub fn invalid_timestamp(text: impl Into<String>) -> Self {
        Self::InvalidTimestamp { text: text.into() }
    }

    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }
}

impl serde::ser::Error for ValueError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::serialization(msg.to_string())
    }
}

impl serde::de::Error for ValueError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::deserialization(msg.to_string())
    }
}
