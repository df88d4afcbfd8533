//! Dispatcher configuration.

use serde::{Deserialize, Serialize};
use stowage_filter::DEFAULT_SORT_FIELD;

/// Configuration for a [`crate::Crud`] dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrudConfig {
    /// Sort field used when a read names none. A leading `-` sorts
    /// descending.
    pub default_sort: String,

    /// Upper bound for the page size of a read. A requested limit of `0`
    /// means this bound.
    pub max_limit: u64,
}

impl Default for CrudConfig {
    fn default() -> Self {
        Self {
            default_sort: DEFAULT_SORT_FIELD.to_string(),
            max_limit: 1000,
        }
    }
}

impl CrudConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default sort field.
    #[must_use]
    pub fn default_sort(mut self, field: impl Into<String>) -> Self {
        self.default_sort = field.into();
        self
    }

    /// Sets the page size bound (at least one).
    #[must_use]
    pub const fn max_limit(mut self, limit: u64) -> Self {
        self.max_limit = if limit == 0 { 1 } else { limit };
        self
    }
}
