//! Relational engine storage.

use super::{logged, DataStorage};
use crate::error::{CoreError, CoreResult};
use crate::registry::ItemHandler;
use stowage_filter::{
    zero_timestamp, DateRange, FacetCount, FacetCounts, FieldValues, Filter, FilterSpecList,
    FilterType, FilterValues, Query,
};
use stowage_store::{
    coerce, count_statement, create_table_statement, delete_statement, distinct_statement,
    extent_statement, facet_count_statement, insert_statement, rehydrate, select_one_statement,
    select_statement, update_statement, ConnectionSource, Pool, PoolConfig, SqlConnection,
    Statement, StoreError, Table,
};
use stowage_value::{FieldNaming, FlatMap, Record, Value};
use tracing::{debug, warn};

const ENGINE: &str = "sql";

/// [`DataStorage`] over a pooled relational engine.
///
/// Each type is one table whose columns are the handler's column paths.
/// Writes go through the flat projection of the record; reads come back
/// as rows labelled with paths and are rebuilt into nested values.
pub struct SqlStorage<S: ConnectionSource> {
    pool: Pool<S>,
}

impl<S> SqlStorage<S>
where
    S: ConnectionSource,
    S::Connection: SqlConnection,
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

    fn execute(&self, build: impl FnOnce(&S::Connection) -> Result<Statement, StoreError>) -> CoreResult<u64> {
        let mut conn = self.pool.get()?;
        let statement = build(&conn)?;
        Ok(conn.execute(&statement)?)
    }

    fn query(&self, build: impl FnOnce(&S::Connection) -> Result<Statement, StoreError>) -> CoreResult<Vec<Record>> {
        let mut conn = self.pool.get()?;
        let statement = build(&conn)?;
        Ok(conn.query(&statement)?)
    }

    fn collect_values(
        &self,
        handler: &dyn ItemHandler,
        specs: &FilterSpecList,
    ) -> CoreResult<FilterValues> {
        let table = handler.table();
        let template = handler.template();
        let mut values = FilterValues::new();
        for spec in specs {
            match spec.kind {
                FilterType::Prop | FilterType::Array => {
                    let rows = self.query(|c| distinct_statement(table, &spec.field, c.dialect()))?;
                    let expected = template.get(&spec.field);
                    let distinct = rows
                        .into_iter()
                        .filter_map(|row| row.into_fields().into_iter().next())
                        .map(|(_, value)| coerce(value, expected))
                        .collect();
                    values.insert(spec.field.clone(), FieldValues::Values(distinct));
                }
                FilterType::DateRange => {
                    let rows = self.query(|c| extent_statement(table, &spec.field, c.dialect()))?;
                    let moment = Value::Timestamp(zero_timestamp());
                    let bound = |row: &Record, label: &str| {
                        row.get(label)
                            .cloned()
                            .map(|v| coerce(v, Some(&moment)))
                            .and_then(|v| v.as_timestamp())
                    };
                    if let Some(row) = rows.first() {
                        let range = DateRange {
                            from: bound(row, "from"),
                            to: bound(row, "to"),
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
        let table = handler.table();
        let mut counts = FacetCounts::new();
        for spec in specs.others(field).filter(|s| s.kind.is_categorical()) {
            let rows = self.query(|c| facet_count_statement(table, &spec.field, filter, c.dialect()))?;
            let expected = handler.template().get(&spec.field);
            let entries = rows
                .iter()
                .filter_map(|row| {
                    let name = coerce(row.get("name")?.clone(), expected);
                    let count = row.get("count")?.as_integer()?;
                    Some(FacetCount::new(name, u64::try_from(count).unwrap_or(0)))
                })
                .collect();
            counts.insert(spec.field.clone(), entries);
        }
        if counts.is_empty() {
            warn!(field, "no categorical filter specs to facet");
        }
        Ok(counts)
    }
}

/// Projects `NULL` into every element column of the array fields that
/// `record` holds as empty arrays.
fn clear_emptied_arrays(table: &Table, record: &Value, flat: &mut FlatMap) {
    for field in table.array_fields() {
        let value = field
            .split('.')
            .try_fold(record, |value, segment| value.get(segment));
        if value.and_then(Value::as_array).is_some_and(<[Value]>::is_empty) {
            for column in table.element_columns(field) {
                flat.insert(column, Value::Null);
            }
        }
    }
}

impl<S> DataStorage for SqlStorage<S>
where
    S: ConnectionSource,
    S::Connection: SqlConnection,
{
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn setup(&self, handler: &dyn ItemHandler) -> CoreResult<()> {
        let result = self
            .execute(|c| create_table_statement(handler.table(), handler.template(), c.dialect()))
            .map(|_| ());
        logged(ENGINE, "setup", handler.data_type(), result)
    }

    fn create(&self, handler: &dyn ItemHandler, record: &Value) -> CoreResult<()> {
        let flat = FlatMap::project(record, FieldNaming::Declared);
        let result = self
            .execute(|c| insert_statement(handler.table(), &flat, c.dialect()))
            .map(|_| ());
        logged(ENGINE, "create", handler.data_type(), result)
    }

    fn update(&self, handler: &dyn ItemHandler, key: &Value, record: &Value) -> CoreResult<()> {
        let mut flat = FlatMap::project(record, FieldNaming::Declared);
        clear_emptied_arrays(handler.table(), record, &mut flat);
        let result = self.execute(|c| update_statement(handler.table(), &flat, key, c.dialect()));
        if logged(ENGINE, "update", handler.data_type(), result)? == 0 {
            debug!(data_type = handler.data_type(), %key, "update matched no row");
        }
        Ok(())
    }

    fn delete(&self, handler: &dyn ItemHandler, key: &Value) -> CoreResult<()> {
        let result = self.execute(|c| delete_statement(handler.table(), key, c.dialect()));
        logged(ENGINE, "delete", handler.data_type(), result).map(|_| ())
    }

    fn retrieve_one(&self, handler: &dyn ItemHandler, key: &Value) -> CoreResult<Option<Value>> {
        let result = self
            .query(|c| select_one_statement(handler.table(), key, c.dialect()))
            .map(|rows| {
                rows.into_iter()
                    .next()
                    .map(|row| rehydrate(row, handler.template()))
            });
        logged(ENGINE, "retrieve_one", handler.data_type(), result)
    }

    fn count(&self, handler: &dyn ItemHandler, filter: &Filter) -> CoreResult<u64> {
        let result = self
            .query(|c| count_statement(handler.table(), filter, c.dialect()))
            .and_then(|rows| {
                rows.first()
                    .and_then(|row| row.get("count"))
                    .and_then(Value::as_integer)
                    .map(|n| u64::try_from(n).unwrap_or(0))
                    .ok_or_else(|| CoreError::from(StoreError::backend("count returned no row")))
            });
        logged(ENGINE, "count", handler.data_type(), result)
    }

    fn retrieve(&self, handler: &dyn ItemHandler, query: &Query) -> CoreResult<Vec<Value>> {
        let limit = (query.page.limit > 0).then_some(query.page.limit);
        let result = self
            .query(|c| {
                select_statement(
                    handler.table(),
                    &query.filter,
                    query.sort.as_ref(),
                    query.page.offset,
                    limit,
                    c.dialect(),
                )
            })
            .map(|rows| {
                rows.into_iter()
                    .map(|row| rehydrate(row, handler.template()))
                    .collect()
            });
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

impl<S: ConnectionSource + std::fmt::Debug> std::fmt::Debug for SqlStorage<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlStorage").field("pool", &self.pool).finish()
    }
}
