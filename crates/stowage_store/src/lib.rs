//! # Stowage Store
//!
//! Engine-facing half of Stowage: connection pooling and the compilers
//! that turn a [`stowage_filter::Filter`] into backend queries.
//!
//! ## Document engines
//!
//! - [`generate_selector`] compiles a filter into a [`Selector`], rendered
//!   in the Mongo query language by [`Selector::to_document`].
//! - [`date_extent_pipeline`] and [`facet_pipeline`] build the
//!   aggregations behind filter values and facet counts.
//! - [`DocumentConnection`] is the engine contract;
//!   [`InMemoryDocumentStore`] implements it in process.
//!
//! ## Relational engines
//!
//! - [`generate_where`] compiles a filter into a parameterized `WHERE`
//!   fragment; the `*_statement` builders cover every storage operation.
//! - [`SqlConnection`] is the engine contract; [`SqliteConnection`]
//!   implements it on bundled SQLite.
//!
//! ## Pooling
//!
//! [`Pool`] hands out scoped [`Lease`]s over connections opened by a
//! [`ConnectionSource`].
//!
//! ## Example
//!
//! ```rust
//! use stowage_filter::{Filter, Matcher};
//! use stowage_store::{generate_where, Dialect, Params, Table};
//!
//! let table = Table::new("task", "id", ["id", "status"]).unwrap();
//! let filter = Filter::new().prop("status", Matcher::one(["open", "blocked"]));
//! let mut params = Params::new(Dialect::Postgres);
//! let fragment = generate_where(&filter, &table, &mut params).unwrap();
//! assert_eq!(fragment, " WHERE \"status\" IN ($1, $2)");
//! assert_eq!(params.len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod pool;
mod sql;

pub use document::{
    date_extent_pipeline, facet_pipeline, generate_selector, render_pipeline, sort_document,
    Accumulator, Condition, DocumentConnection, FindOptions, InMemoryDocumentStore, Selector,
    Stage,
};
pub use error::{StoreError, StoreResult};
pub use pool::{ConnectionSource, Lease, Pool, PoolConfig, PoolStats};
pub use sql::{
    coerce, column_name, count_statement, create_table_statement, delete_statement,
    distinct_statement, extent_statement, facet_count_statement, generate_where,
    insert_statement, quote_ident, rehydrate, select_one_statement, select_statement,
    update_statement, Dialect, Params, SqlConnection, SqliteConnection, SqliteSource, Statement,
    Table,
};
