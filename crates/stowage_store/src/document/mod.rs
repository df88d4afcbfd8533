//! Document-store side: selectors, pipelines and the connection contract.

mod memory;
mod pipeline;
mod selector;

pub use memory::InMemoryDocumentStore;
pub use pipeline::{
    date_extent_pipeline, facet_pipeline, render_pipeline, Accumulator, Stage,
};
pub use selector::{generate_selector, sort_document, Condition, Selector};

use crate::error::StoreResult;
use stowage_filter::SortField;
use stowage_value::Value;

/// Options for [`DocumentConnection::find`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Sort order.
    pub sort: Option<SortField>,
    /// Documents to skip.
    pub skip: u64,
    /// Maximum documents to return.
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Creates options returning everything in natural order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sort order.
    #[must_use]
    pub fn sort(mut self, sort: SortField) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the number of documents to skip.
    #[must_use]
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the maximum number of documents.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A connection to a document store.
///
/// Collections are named after record types. Documents are [`Value`]
/// records or maps. A `None` selector matches every document.
pub trait DocumentConnection: Send {
    /// Inserts a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the write.
    fn insert_one(&mut self, collection: &str, document: Value) -> StoreResult<()>;

    /// Replaces the first document matching `selector`. Returns the
    /// number of replaced documents (0 or 1).
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the write.
    fn replace_one(
        &mut self,
        collection: &str,
        selector: &Selector,
        document: Value,
    ) -> StoreResult<u64>;

    /// Deletes the first document matching `selector`. Returns the number
    /// of deleted documents (0 or 1).
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the write.
    fn delete_one(&mut self, collection: &str, selector: &Selector) -> StoreResult<u64>;

    /// Returns the first document matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails. No match is not an error.
    fn find_one(&mut self, collection: &str, selector: &Selector) -> StoreResult<Option<Value>>;

    /// Returns the documents matching `selector`, sorted and windowed.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn find(
        &mut self,
        collection: &str,
        selector: Option<&Selector>,
        options: &FindOptions,
    ) -> StoreResult<Vec<Value>>;

    /// Counts the documents matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn count(&mut self, collection: &str, selector: Option<&Selector>) -> StoreResult<u64>;

    /// Returns the distinct values of `field`; array fields contribute
    /// their elements.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn distinct(
        &mut self,
        collection: &str,
        field: &str,
        selector: Option<&Selector>,
    ) -> StoreResult<Vec<Value>>;

    /// Runs an aggregation pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the pipeline.
    fn aggregate(&mut self, collection: &str, pipeline: &[Stage]) -> StoreResult<Vec<Value>>;
}
