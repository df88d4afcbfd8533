//! Sorting, paging and list envelopes.

use crate::error::{FilterError, FilterResult};
use crate::filter::Filter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sort field used when a read does not name one.
pub const DEFAULT_SORT_FIELD: &str = "-createdAt";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// Numeric form used by document stores: `1` or `-1`.
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    /// SQL keyword.
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// A field to sort by, parsed from `name` or `-name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortField {
    /// Field path without direction prefix.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

impl SortField {
    /// Sorts ascending by `field`.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Sorts descending by `field`.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parses `-name` as descending and `name` as ascending.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::EmptySortField`] if no field name remains.
    pub fn parse(text: &str) -> FilterResult<Self> {
        let (field, direction) = match text.strip_prefix('-') {
            Some(rest) => (rest, SortDirection::Descending),
            None => (text, SortDirection::Ascending),
        };
        if field.is_empty() {
            return Err(FilterError::EmptySortField);
        }
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

impl Default for SortField {
    fn default() -> Self {
        Self::descending("createdAt")
    }
}

impl FromStr for SortField {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.direction == SortDirection::Descending {
            f.write_str("-")?;
        }
        f.write_str(&self.field)
    }
}

/// Offset and limit of a paged read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Page {
    /// Records to skip.
    pub offset: u64,
    /// Maximum records to return. `0` means "as many as allowed".
    pub limit: u64,
}

impl Page {
    /// Creates a page.
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Parses raw `offset` and `limit` parameters. Both must be present.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidPaging`] for a missing or malformed
    /// parameter.
    pub fn parse(offset: Option<&str>, limit: Option<&str>) -> FilterResult<Self> {
        let number = |name: &'static str, raw: Option<&str>| -> FilterResult<u64> {
            raw.filter(|s| !s.is_empty())
                .and_then(|s| s.trim().parse().ok())
                .ok_or_else(|| FilterError::invalid_paging(name, raw))
        };
        Ok(Self {
            offset: number("offset", offset)?,
            limit: number("limit", limit)?,
        })
    }

    /// Returns the effective limit: `limit` capped at `max`, with `0`
    /// meaning `max`.
    pub fn capped_limit(&self, max: u64) -> u64 {
        if self.limit == 0 {
            max
        } else {
            self.limit.min(max)
        }
    }
}

/// A filtered, sorted, paged read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// Selection.
    pub filter: Filter,
    /// Sort order. `None` uses the configured default.
    pub sort: Option<SortField>,
    /// Paging window.
    pub page: Page,
}

impl Query {
    /// Creates an unrestricted query with the default sort and page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the sort field.
    #[must_use]
    pub fn sort(mut self, sort: SortField) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the paging window.
    #[must_use]
    pub fn page(mut self, offset: u64, limit: u64) -> Self {
        self.page = Page::new(offset, limit);
        self
    }
}

/// A page of records plus the number of records matched overall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountList<T> {
    /// Matches before paging.
    pub total: u64,
    /// The page.
    pub data: Vec<T>,
}
