//! # Stowage Filter
//!
//! Backend-neutral description of reads.
//!
//! - [`Filter`]: per-field constraints (categorical, boolean, date range,
//!   list membership) combined conjunctively.
//! - [`FilterSpec`]: the filterable fields of a record type, used to
//!   enumerate candidate values and facet counts.
//! - [`SortField`], [`Page`], [`Query`]: ordering and paging.
//! - [`CountList`]: a page plus the overall match count.
//!
//! Compiling a filter into a backend query is the job of the storage
//! crate; this crate only defines the model and its JSON shape.
//!
//! ```
//! use stowage_filter::{Filter, MatchStrategy, Matcher};
//!
//! let filter = Filter::from_json(r#"{"props": {"status": {"fields": ["open"]}}}"#).unwrap();
//! assert_eq!(filter.props["status"].strategy, MatchStrategy::One);
//!
//! let same = Filter::new().prop("status", Matcher::one(["open"]));
//! assert_eq!(filter, same);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod facet;
mod filter;
mod query;

pub use error::{FilterError, FilterResult};
pub use facet::{FacetCount, FacetCounts, FieldValues, FilterSpec, FilterSpecList, FilterType, FilterValues};
pub use filter::{end_of_day, start_of_day, zero_timestamp, DateRange, Filter, MatchStrategy, Matcher};
pub use query::{CountList, Page, Query, SortDirection, SortField, DEFAULT_SORT_FIELD};
