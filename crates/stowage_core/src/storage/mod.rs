//! Storage abstraction behind the dispatcher.
//!
//! A [`DataStorage`] performs one operation for one registered type. The
//! dispatcher resolves the handler, binds bodies and resolves paging
//! defaults; storages only translate to their engine.
//!
//! - [`DocumentStorage`]: document engines via compiled selectors and
//!   aggregation pipelines.
//! - [`SqlStorage`]: relational engines via flat projection and
//!   parameterized statements.

mod document;
mod sql;

pub use document::DocumentStorage;
pub use sql::SqlStorage;

use crate::error::CoreResult;
use crate::registry::ItemHandler;
use std::panic::Location;
use stowage_filter::{CountList, FacetCounts, Filter, FilterSpecList, FilterValues, Query};
use stowage_value::Value;
use tracing::error;

/// One storage engine.
///
/// `query` arguments arrive resolved: the sort is set and the page limit
/// is already capped (`0` only if the caller passed an unbounded query
/// directly).
pub trait DataStorage: Send + Sync {
    /// Engine name, for logs.
    fn name(&self) -> &'static str;

    /// Prepares the engine for a type, e.g. creates its table.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the preparation.
    fn setup(&self, handler: &dyn ItemHandler) -> CoreResult<()>;

    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the write.
    fn create(&self, handler: &dyn ItemHandler, record: &Value) -> CoreResult<()>;

    /// Replaces the record with `key`. A missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the write.
    fn update(&self, handler: &dyn ItemHandler, key: &Value, record: &Value) -> CoreResult<()>;

    /// Deletes the record with `key`. A missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the write.
    fn delete(&self, handler: &dyn ItemHandler, key: &Value) -> CoreResult<()>;

    /// Reads the record with `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails. A missing key yields `None`.
    fn retrieve_one(&self, handler: &dyn ItemHandler, key: &Value) -> CoreResult<Option<Value>>;

    /// Counts the records selected by `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot be compiled or the read fails.
    fn count(&self, handler: &dyn ItemHandler, filter: &Filter) -> CoreResult<u64>;

    /// Reads a sorted page of the records selected by the query filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot be compiled or the read fails.
    fn retrieve(&self, handler: &dyn ItemHandler, query: &Query) -> CoreResult<Vec<Value>>;

    /// Reads a page and the overall match count.
    ///
    /// The two reads are separate; a write landing between them can make
    /// `total` disagree with the page. The first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the error of the failing read.
    fn retrieve_with_count(
        &self,
        handler: &dyn ItemHandler,
        query: &Query,
    ) -> CoreResult<CountList<Value>> {
        let data = self.retrieve(handler, query)?;
        let total = self.count(handler, &query.filter)?;
        Ok(CountList { total, data })
    }

    /// Candidate values per spec: distinct values for prop and array
    /// specs, the extent for date specs. Other spec kinds and fields
    /// without data are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if a read fails.
    fn filter_values(
        &self,
        handler: &dyn ItemHandler,
        specs: &FilterSpecList,
    ) -> CoreResult<FilterValues>;

    /// Value counts of every categorical spec other than `field`, within
    /// the records selected by `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot be compiled or a read fails.
    fn filter_values_x(
        &self,
        handler: &dyn ItemHandler,
        field: &str,
        specs: &FilterSpecList,
        filter: &Filter,
    ) -> CoreResult<FacetCounts>;
}

/// Logs a failed storage operation with the location of the caller.
#[track_caller]
pub(crate) fn logged<T>(
    engine: &'static str,
    op: &'static str,
    data_type: &str,
    result: CoreResult<T>,
) -> CoreResult<T> {
    if let Err(err) = &result {
        let at = Location::caller();
        error!(
            engine,
            op,
            data_type,
            file = at.file(),
            line = at.line(),
            error = %err,
            "storage operation failed"
        );
    }
    result
}
