//! The generic CRUD dispatcher.

use crate::config::CrudConfig;
use crate::error::{CoreError, CoreResult};
use crate::item::{decode, Item};
use crate::registry::{ItemHandler, TypeRegistry};
use crate::storage::DataStorage;
use chrono::Utc;
use serde_json::Value as Json;
use std::sync::Arc;
use stowage_filter::{
    CountList, FacetCounts, Filter, FilterSpecList, FilterValues, Page, Query, SortField,
};
use stowage_value::{to_value, Value};
use tracing::debug;

/// Dispatches record operations by type name to one storage engine.
///
/// Writes bind JSON bodies onto zero instances of the registered type;
/// reads resolve the default sort and cap the page size before the
/// storage sees them.
///
/// # Example
///
/// ```rust,ignore
/// use stowage_core::{Crud, CrudConfig, DocumentStorage, RegistryBuilder};
/// use stowage_store::{InMemoryDocumentStore, PoolConfig};
///
/// let registry = RegistryBuilder::new().register::<Task>()?.seal();
/// let storage = DocumentStorage::new(InMemoryDocumentStore::new(), PoolConfig::default());
/// let crud = Crud::new(registry, storage, CrudConfig::default());
///
/// let task = crud.create("task", &serde_json::json!({"title": "write"}), "ann")?;
/// let page = crud.retrieve_with_count("task", &Query::new().page(0, 20))?;
/// ```
pub struct Crud<S: DataStorage> {
    registry: Arc<TypeRegistry>,
    storage: S,
    config: CrudConfig,
}

impl<S: DataStorage> Crud<S> {
    /// Creates a dispatcher.
    pub fn new(registry: Arc<TypeRegistry>, storage: S, config: CrudConfig) -> Self {
        Self {
            registry,
            storage,
            config,
        }
    }

    /// Returns the type registry.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Returns the storage engine.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CrudConfig {
        &self.config
    }

    fn handler(&self, data_type: &str) -> CoreResult<&dyn ItemHandler> {
        self.registry.get(data_type)
    }

    /// Prepares the storage for every registered type.
    ///
    /// # Errors
    ///
    /// Returns the first preparation failure.
    pub fn setup(&self) -> CoreResult<()> {
        for handler in self.registry.handlers() {
            self.storage.setup(handler)?;
        }
        Ok(())
    }

    /// Binds `body` onto a fresh instance created by `actor` and stores it.
    /// Returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`], [`CoreError::Binding`] or the
    /// storage error.
    pub fn create(&self, data_type: &str, body: &Json, actor: &str) -> CoreResult<Value> {
        let handler = self.handler(data_type)?;
        let record = handler.bind_new(body, actor, Utc::now())?;
        self.storage.create(handler, &record)?;
        Ok(record)
    }

    /// Binds `body`, stamps `actor` as modifier and replaces the stored
    /// record with the same key. Returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`], [`CoreError::Binding`] or the
    /// storage error. A key with no stored record is not an error.
    pub fn update(&self, data_type: &str, body: &Json, actor: &str) -> CoreResult<Value> {
        let handler = self.handler(data_type)?;
        let (key, record) = handler.bind_update(body, actor, Utc::now())?;
        self.storage.update(handler, &key, &record)?;
        Ok(record)
    }

    /// Deletes the record with `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] or the storage error.
    pub fn delete(&self, data_type: &str, key: &Value) -> CoreResult<()> {
        let handler = self.handler(data_type)?;
        self.storage.delete(handler, key)
    }

    /// Reads the record with `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] or the storage error.
    pub fn retrieve_one(&self, data_type: &str, key: &Value) -> CoreResult<Option<Value>> {
        let handler = self.handler(data_type)?;
        self.storage.retrieve_one(handler, key)
    }

    /// Counts the records selected by `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] or the storage error.
    pub fn count(&self, data_type: &str, filter: &Filter) -> CoreResult<u64> {
        let handler = self.handler(data_type)?;
        self.storage.count(handler, filter)
    }

    /// Reads a sorted page of the records selected by the query.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`], a malformed default sort or the
    /// storage error.
    pub fn retrieve(&self, data_type: &str, query: &Query) -> CoreResult<Vec<Value>> {
        let handler = self.handler(data_type)?;
        let query = self.resolve(query)?;
        self.storage.retrieve(handler, &query)
    }

    /// Reads a page plus the overall match count. The two reads are not
    /// atomic.
    ///
    /// # Errors
    ///
    /// Returns the first failure.
    pub fn retrieve_with_count(&self, data_type: &str, query: &Query) -> CoreResult<CountList<Value>> {
        let handler = self.handler(data_type)?;
        let query = self.resolve(query)?;
        self.storage.retrieve_with_count(handler, &query)
    }

    /// Candidate values for each filter spec.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] or the storage error.
    pub fn filter_values(&self, data_type: &str, specs: &FilterSpecList) -> CoreResult<FilterValues> {
        let handler = self.handler(data_type)?;
        self.storage.filter_values(handler, specs)
    }

    /// Facet counts for every categorical spec other than `field`, within
    /// the records selected by `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] or the storage error.
    pub fn filter_values_x(
        &self,
        data_type: &str,
        field: &str,
        specs: &FilterSpecList,
        filter: &Filter,
    ) -> CoreResult<FacetCounts> {
        let handler = self.handler(data_type)?;
        self.storage.filter_values_x(handler, field, specs, filter)
    }

    /// Stores an already built item.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] if `T` is not registered, or the
    /// storage error.
    pub fn create_item<T: Item>(&self, item: &T) -> CoreResult<()> {
        let handler = self.handler(T::DATA_TYPE)?;
        self.storage.create(handler, &to_value(item)?)
    }

    /// Stamps `actor` as modifier of `item` and replaces the stored copy.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] if `T` is not registered, or the
    /// storage error.
    pub fn update_item<T: Item>(&self, item: &mut T, actor: &str) -> CoreResult<()> {
        let handler = self.handler(T::DATA_TYPE)?;
        item.set_mod_info(Utc::now(), actor);
        self.storage.update(handler, &item.key(), &to_value(&*item)?)
    }

    /// Reads the record with `key` as a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`], [`CoreError::Binding`] if the
    /// stored record does not fit `T`, or the storage error.
    pub fn retrieve_one_as<T: Item>(&self, key: &Value) -> CoreResult<Option<T>> {
        self.retrieve_one(T::DATA_TYPE, key)?
            .map(|value| decode(&value))
            .transpose()
    }

    /// Reads a page of records as `T`s.
    ///
    /// # Errors
    ///
    /// As [`Crud::retrieve`], plus [`CoreError::Binding`] for records that
    /// do not fit `T`.
    pub fn retrieve_as<T: Item>(&self, query: &Query) -> CoreResult<Vec<T>> {
        self.retrieve(T::DATA_TYPE, query)?
            .iter()
            .map(decode)
            .collect()
    }

    /// Fills in the default sort and caps the page size.
    fn resolve(&self, query: &Query) -> CoreResult<Query> {
        let sort = match &query.sort {
            Some(sort) => sort.clone(),
            None => SortField::parse(&self.config.default_sort)?,
        };
        let limit = query.page.capped_limit(self.config.max_limit);
        if limit != query.page.limit {
            debug!(requested = query.page.limit, limit, "page size capped");
        }
        Ok(Query {
            filter: query.filter.clone(),
            sort: Some(sort),
            page: Page::new(query.page.offset, limit),
        })
    }
}

impl<S: DataStorage> std::fmt::Debug for Crud<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crud")
            .field("registry", &self.registry)
            .field("storage", &self.storage.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Builds a [`Query`] from raw request parameters.
///
/// `filter` is the JSON filter document (absent or empty means no
/// restriction), `sort` an optional sort field with `-` prefix for
/// descending. Offset and limit must both be present.
///
/// # Errors
///
/// Returns [`CoreError::Filter`] for malformed input.
pub fn parse_query(
    filter: Option<&str>,
    sort: Option<&str>,
    offset: Option<&str>,
    limit: Option<&str>,
) -> CoreResult<Query> {
    let filter = Filter::from_json(filter.unwrap_or_default())?;
    let sort = sort
        .filter(|s| !s.trim().is_empty())
        .map(SortField::parse)
        .transpose()?;
    let page = Page::parse(offset, limit)?;
    Ok(Query { filter, sort, page })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_filter::{FilterError, MatchStrategy};

    #[test]
    fn query_parameters() {
        let query = parse_query(
            Some(r#"{"props": {"status": {"strategy": "none", "fields": ["done"]}}}"#),
            Some("-priority"),
            Some("10"),
            Some("5"),
        )
        .unwrap();
        assert_eq!(query.filter.props["status"].strategy, MatchStrategy::None);
        assert_eq!(query.sort, Some(SortField::descending("priority")));
        assert_eq!(query.page, Page::new(10, 5));

        let query = parse_query(None, None, Some("0"), Some("0")).unwrap();
        assert!(query.filter.is_unrestricted());
        assert_eq!(query.sort, None);
    }

    #[test]
    fn paging_requires_both_parameters() {
        let err = parse_query(None, None, Some("0"), None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Filter(FilterError::InvalidPaging { name: "limit", .. })
        ));
    }
}
