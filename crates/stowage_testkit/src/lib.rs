//! # Stowage Testkit
//!
//! Test utilities for Stowage.
//!
//! This crate provides:
//! - Sample record types and seed data
//! - Ready-to-use dispatchers over the in-memory document store and SQLite
//! - Property-based generators for records and filters
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stowage_testkit::prelude::*;
//!
//! #[test]
//! fn counts_open_tasks() {
//!     let crud = TestCrud::sqlite().seeded();
//!     let filter = Filter::new().prop("status", Matcher::one(["open"]));
//!     assert_eq!(crud.count("task", &filter).unwrap(), 2);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
    pub use stowage_filter::{DateRange, Filter, FilterSpec, FilterSpecList, FilterType, Matcher, Query, SortField};
    pub use stowage_value::Value;
}

pub use fixtures::*;
pub use generators::*;

/// Installs a test-friendly `tracing` subscriber once.
///
/// The level comes from `RUST_LOG` and defaults to `warn`. Repeated calls
/// are no-ops.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
