//! Document engine storage.

use super::{logged, DataStorage};
use crate::error::{CoreError, CoreResult};
use crate::registry::ItemHandler;
use stowage_filter::{
    DateRange, FacetCount, FacetCounts, FieldValues, Filter, FilterSpecList, FilterType,
    FilterValues, Query,
};
use stowage_store::{
    date_extent_pipeline, facet_pipeline, generate_selector, ConnectionSource, DocumentConnection,
    FindOptions, Pool, PoolConfig, Selector,
};
use stowage_value::Value;
use tracing::debug;

const ENGINE: &str = "document";

/// [`DataStorage`] over a pooled document engine.
///
/// Records are stored as-is in a collection named after their type and
/// matched by `{keyField: key}`.
pub struct DocumentStorage<S: ConnectionSource> {
    pool: Pool<S>,
}

impl<S> DocumentStorage<S>
where
    S: ConnectionSource,
    S::Connection: DocumentConnection,
{
    /// Creates a storage over a new pool.
    pub fn new(source: S, config: PoolConfig) -> Self {
        Self {
            pool: Pool::new(source, config),
        }
    }

    /// Returns the connection pool.
    pub fn pool(&self) -> &Pool<S> {
        &self.pool
    }

    fn key_selector(handler: &dyn ItemHandler, key: &Value) -> Selector {
        Selector::eq(handler.key_field(), key.clone())
    }

    fn collect_values(
        &self,
        handler: &dyn ItemHandler,
        specs: &FilterSpecList,
    ) -> CoreResult<FilterValues> {
        let collection = handler.data_type();
        let mut conn = self.pool.get()?;
        let mut values = FilterValues::new();
        for spec in specs {
            match spec.kind {
                FilterType::Prop | FilterType::Array => {
                    let distinct = conn.distinct(collection, &spec.field, None)?;
                    values.insert(spec.field.clone(), FieldValues::Values(distinct));
                }
                FilterType::DateRange => {
                    let docs = conn.aggregate(collection, &date_extent_pipeline(&spec.field))?;
                    if let Some(doc) = docs.first() {
                        let range = DateRange {
                            from: doc.get("from").and_then(Value::as_timestamp),
                            to: doc.get("to").and_then(Value::as_timestamp),
                        };
                        if range.from.is_some() || range.to.is_some() {
                            values.insert(spec.field.clone(), FieldValues::Range(range));
                        }
                    }
                }
                FilterType::Boolean | FilterType::Search | FilterType::Constant | FilterType::Static => {}
            }
        }
        Ok(values)
    }

    fn collect_facets(
        &self,
        handler: &dyn ItemHandler,
        field: &str,
        specs: &FilterSpecList,
        filter: &Filter,
    ) -> CoreResult<FacetCounts> {
        let pipeline = facet_pipeline(field, specs, filter);
        let docs = self.pool.get()?.aggregate(handler.data_type(), &pipeline)?;
        let mut counts = FacetCounts::new();
        let Some(Value::Map(facets)) = docs.into_iter().next() else {
            return Ok(counts);
        };
        for (name, buckets) in facets {
            let Some(name) = name.as_text() else { continue };
            let entries = buckets
                .as_array()
                .unwrap_or_default()
                .iter()
                .filter_map(|bucket| {
                    let value = bucket.get("_id")?;
                    if value.is_null() {
                        return None;
                    }
                    let count = bucket.get("count")?.as_integer()?;
                    Some(FacetCount::new(value.clone(), u64::try_from(count).unwrap_or(0)))
                })
                .collect();
            counts.insert(name.to_string(), entries);
        }
        Ok(counts)
    }
}

impl<S> DataStorage for DocumentStorage<S>
where
    S: ConnectionSource,
    S::Connection: DocumentConnection,
{
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn setup(&self, handler: &dyn ItemHandler) -> CoreResult<()> {
        debug!(data_type = handler.data_type(), "document collections need no setup");
        Ok(())
    }

    fn create(&self, handler: &dyn ItemHandler, record: &Value) -> CoreResult<()> {
        let result = self
            .pool
            .get()
            .and_then(|mut conn| conn.insert_one(handler.data_type(), record.clone()))
            .map_err(CoreError::from);
        logged(ENGINE, "create", handler.data_type(), result)
    }

    fn update(&self, handler: &dyn ItemHandler, key: &Value, record: &Value) -> CoreResult<()> {
        let selector = Self::key_selector(handler, key);
        let result = self
            .pool
            .get()
            .and_then(|mut conn| conn.replace_one(handler.data_type(), &selector, record.clone()))
            .map_err(CoreError::from);
        let replaced = logged(ENGINE, "update", handler.data_type(), result)?;
        if replaced == 0 {
            debug!(data_type = handler.data_type(), %key, "update matched no record");
        }
        Ok(())
    }

    fn delete(&self, handler: &dyn ItemHandler, key: &Value) -> CoreResult<()> {
        let selector = Self::key_selector(handler, key);
        let result = self
            .pool
            .get()
            .and_then(|mut conn| conn.delete_one(handler.data_type(), &selector))
            .map_err(CoreError::from);
        logged(ENGINE, "delete", handler.data_type(), result).map(|_| ())
    }

    fn retrieve_one(&self, handler: &dyn ItemHandler, key: &Value) -> CoreResult<Option<Value>> {
        let selector = Self::key_selector(handler, key);
        let result = self
            .pool
            .get()
            .and_then(|mut conn| conn.find_one(handler.data_type(), &selector))
            .map_err(CoreError::from);
        logged(ENGINE, "retrieve_one", handler.data_type(), result)
    }

    fn count(&self, handler: &dyn ItemHandler, filter: &Filter) -> CoreResult<u64> {
        let selector = generate_selector(filter);
        let result = self
            .pool
            .get()
            .and_then(|mut conn| conn.count(handler.data_type(), selector.as_ref()))
            .map_err(CoreError::from);
        logged(ENGINE, "count", handler.data_type(), result)
    }

    fn retrieve(&self, handler: &dyn ItemHandler, query: &Query) -> CoreResult<Vec<Value>> {
        let selector = generate_selector(&query.filter);
        let mut options = FindOptions::new().skip(query.page.offset);
        if let Some(sort) = &query.sort {
            options = options.sort(sort.clone());
        }
        if query.page.limit > 0 {
            options = options.limit(query.page.limit);
        }
        let result = self
            .pool
            .get()
            .and_then(|mut conn| conn.find(handler.data_type(), selector.as_ref(), &options))
            .map_err(CoreError::from);
        logged(ENGINE, "retrieve", handler.data_type(), result)
    }

    fn filter_values(
        &self,
        handler: &dyn ItemHandler,
        specs: &FilterSpecList,
    ) -> CoreResult<FilterValues> {
        logged(
            ENGINE,
            "filter_values",
            handler.data_type(),
            self.collect_values(handler, specs),
        )
    }

    fn filter_values_x(
        &self,
        handler: &dyn ItemHandler,
        field: &str,
        specs: &FilterSpecList,
        filter: &Filter,
    ) -> CoreResult<FacetCounts> {
        logged(
            ENGINE,
            "filter_values_x",
            handler.data_type(),
            self.collect_facets(handler, field, specs, filter),
        )
    }
}

impl<S: ConnectionSource + std::fmt::Debug> std::fmt::Debug for DocumentStorage<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStorage").field("pool", &self.pool).finish()
    }
}
