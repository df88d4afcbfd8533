//! Statement compilation for relational engines.

use super::{Dialect, Params, Statement};
use crate::error::{StoreError, StoreResult};
use stowage_filter::{Filter, MatchStrategy, Matcher, SortField};
use stowage_value::{FlatMap, Value};
use tracing::debug;

/// Normalizes a projected path into a column name: ASCII lower-case, with
/// every character that is not alphanumeric or `_` replaced by `_`.
///
/// ```rust
/// use stowage_store::column_name;
///
/// assert_eq!(column_name("createdAt"), "createdat");
/// assert_eq!(column_name("owner.name"), "owner_name");
/// assert_eq!(column_name("tags.0"), "tags_0");
/// ```
pub fn column_name(path: &str) -> String {
    path.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Wraps an identifier in double quotes.
///
/// # Errors
///
/// Returns [`StoreError::InvalidIdentifier`] for empty names and names
/// containing quotes or NUL characters.
pub fn quote_ident(name: &str) -> StoreResult<String> {
    if name.is_empty() || name.contains('"') || name.contains('\0') {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

/// Relational layout of one record type.
///
/// `columns` are flat projection paths; the stored column of a path is
/// its [`column_name`]. A path `f` that is not itself a column but has
/// element columns `f.0`, `f.1`, ... is treated as an array field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    key: String,
    columns: Vec<String>,
}

impl Table {
    /// Creates a table layout. The key path is added to the columns if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidIdentifier`] if the table name cannot
    /// be quoted or two paths normalize to the same column.
    pub fn new<I, C>(name: impl Into<String>, key: impl Into<String>, columns: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let name = name.into();
        let key = key.into();
        quote_ident(&name)?;
        let mut paths: Vec<String> = columns.into_iter().map(Into::into).collect();
        if !paths.contains(&key) {
            paths.insert(0, key.clone());
        }
        let mut seen = Vec::with_capacity(paths.len());
        for path in &paths {
            quote_ident(path)?;
            let column = column_name(path);
            if column.is_empty() || seen.contains(&column) {
                return Err(StoreError::InvalidIdentifier(path.clone()));
            }
            seen.push(column);
        }
        Ok(Self {
            name,
            key,
            columns: paths,
        })
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the key path.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the column paths in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns true if `path` is stored as a column.
    pub fn has_column(&self, path: &str) -> bool {
        self.columns.iter().any(|c| c == path)
    }

    /// Returns the element columns `path.N` of an array field.
    pub fn element_columns(&self, path: &str) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| {
                c.strip_prefix(path)
                    .and_then(|rest| rest.strip_prefix('.'))
                    .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
            })
            .map(String::as_str)
            .collect()
    }

    /// Returns the array fields, i.e. the distinct `f` of element columns
    /// `f.N`, in declaration order.
    pub fn array_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for path in &self.columns {
            if let Some(field) = self.array_field_of(path) {
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }
        fields
    }

    fn array_field_of<'a>(&self, path: &'a str) -> Option<&'a str> {
        let (field, index) = path.rsplit_once('.')?;
        let numeric = !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit());
        (numeric && !self.has_column(field)).then_some(field)
    }

    /// Element column of an array field that `flat` carries other
    /// elements of, but not this one.
    fn is_unused_element(&self, path: &str, flat: &FlatMap) -> bool {
        self.array_field_of(path).is_some_and(|field| {
            self.element_columns(field)
                .into_iter()
                .any(|c| flat.contains(c))
        })
    }

    /// Rejects projections with leaves the table has no column for.
    fn check_stored(&self, flat: &FlatMap) -> StoreResult<()> {
        let unstored: Vec<String> = flat
            .paths()
            .filter(|path| !self.has_column(path))
            .map(str::to_string)
            .collect();
        if unstored.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Unstored {
                table: self.name.clone(),
                paths: unstored,
            })
        }
    }

    fn quoted_name(&self) -> String {
        format!("\"{}\"", self.name)
    }

    fn quoted_column(&self, path: &str) -> StoreResult<String> {
        if self.has_column(path) {
            quote_ident(&column_name(path))
        } else {
            Err(StoreError::unknown_column(&self.name, path))
        }
    }

    /// Quoted columns backing `path`: the column itself, or its element
    /// columns. The flag is true for element columns.
    fn backing_columns(&self, path: &str) -> StoreResult<(Vec<String>, bool)> {
        if self.has_column(path) {
            return Ok((vec![self.quoted_column(path)?], false));
        }
        let elements = self.element_columns(path);
        if elements.is_empty() {
            return Err(StoreError::unknown_column(&self.name, path));
        }
        let quoted = elements
            .into_iter()
            .map(|c| quote_ident(&column_name(c)))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((quoted, true))
    }

    fn select_list(&self) -> StoreResult<String> {
        let mut items = Vec::with_capacity(self.columns.len());
        for path in &self.columns {
            items.push(format!("{} AS {}", quote_ident(&column_name(path))?, quote_ident(path)?));
        }
        Ok(items.join(", "))
    }
}

fn value_list(values: &[Value], params: &mut Params) -> String {
    values
        .iter()
        .map(|v| params.push(v.clone()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn scalar_clause(column: &str, matcher: &Matcher, params: &mut Params) -> String {
    match matcher.strategy {
        MatchStrategy::One => format!("{column} IN ({})", value_list(&matcher.fields, params)),
        MatchStrategy::None => format!(
            "({column} IS NULL OR {column} NOT IN ({}))",
            value_list(&matcher.fields, params)
        ),
        MatchStrategy::All => {
            let parts: Vec<String> = matcher
                .fields
                .iter()
                .map(|v| format!("{column} = {}", params.push(v.clone())))
                .collect();
            format!("({})", parts.join(" AND "))
        }
    }
}

fn element_clause(columns: &[String], matcher: &Matcher, params: &mut Params) -> String {
    match matcher.strategy {
        MatchStrategy::One => {
            let list = value_list(&matcher.fields, params);
            let parts: Vec<String> = columns.iter().map(|c| format!("{c} IN ({list})")).collect();
            format!("({})", parts.join(" OR "))
        }
        MatchStrategy::None => {
            let list = value_list(&matcher.fields, params);
            let parts: Vec<String> = columns
                .iter()
                .map(|c| format!("({c} IS NULL OR {c} NOT IN ({list}))"))
                .collect();
            format!("({})", parts.join(" AND "))
        }
        MatchStrategy::All => {
            let parts: Vec<String> = matcher
                .fields
                .iter()
                .map(|v| {
                    let p = params.push(v.clone());
                    let any: Vec<String> = columns.iter().map(|c| format!("{c} = {p}")).collect();
                    format!("({})", any.join(" OR "))
                })
                .collect();
            format!("({})", parts.join(" AND "))
        }
    }
}

fn matcher_clause(
    table: &Table,
    path: &str,
    matcher: &Matcher,
    params: &mut Params,
) -> StoreResult<String> {
    let (columns, elements) = table.backing_columns(path)?;
    Ok(if elements {
        element_clause(&columns, matcher, params)
    } else {
        scalar_clause(&columns[0], matcher, params)
    })
}

/// Compiles `filter` into a WHERE fragment with a leading space.
///
/// Clauses are joined with `AND`, in the same order as the document
/// compiler. Values are appended to `params`. Without clauses the
/// fragment is the always-true ` WHERE 1 = 1`, so callers can append
/// further conditions with `AND`.
///
/// | Filter entry | Fragment |
/// |---|---|
/// | strategy `one` | `c IN (..)` |
/// | strategy `none` | `(c IS NULL OR c NOT IN (..))` |
/// | strategy `all` | `(c = $1 AND c = $2 ..)` |
/// | bool | `c = $n` |
/// | date range | `c >= start of day AND c <= end of day` |
///
/// Array fields stored as element columns match when any element column
/// does (`one`, `all`) or when none does (`none`).
///
/// # Errors
///
/// Returns [`StoreError::UnknownColumn`] if the filter names a field the
/// table does not store.
pub fn generate_where(filter: &Filter, table: &Table, params: &mut Params) -> StoreResult<String> {
    let mut clauses = Vec::new();
    for (path, matcher) in &filter.props {
        if !matcher.is_empty() {
            clauses.push(matcher_clause(table, path, matcher, params)?);
        }
    }
    for (path, value) in &filter.bools {
        if !value.is_null() {
            let column = table.quoted_column(path)?;
            let p = params.push(value.clone());
            clauses.push(format!("{column} = {p}"));
        }
    }
    for (path, range) in &filter.dates {
        if let Some((from, to)) = range.bounds() {
            let column = table.quoted_column(path)?;
            let lower = params.push(Value::Timestamp(from));
            let upper = params.push(Value::Timestamp(to));
            clauses.push(format!("{column} >= {lower} AND {column} <= {upper}"));
        }
    }
    for (path, matcher) in &filter.lists {
        if !matcher.is_empty() {
            clauses.push(matcher_clause(table, path, matcher, params)?);
        }
    }
    if !filter.searches.is_empty() {
        debug!(table = table.name(), searches = filter.searches.len(), "search filters are not compiled");
    }
    if clauses.is_empty() {
        Ok(" WHERE 1 = 1".to_string())
    } else {
        Ok(format!(" WHERE {}", clauses.join(" AND ")))
    }
}

/// `INSERT` of the projected values.
///
/// # Errors
///
/// Returns [`StoreError::Unstored`] if the projection has a path the table
/// has no column for, or an error if an identifier cannot be quoted.
pub fn insert_statement(table: &Table, flat: &FlatMap, dialect: Dialect) -> StoreResult<Statement> {
    table.check_stored(flat)?;
    let mut params = Params::new(dialect);
    let mut columns = Vec::new();
    let mut holders = Vec::new();
    for path in table.columns() {
        if let Some(value) = flat.get(path) {
            columns.push(quote_ident(&column_name(path))?);
            holders.push(params.push(value.clone()));
        }
    }
    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", table.quoted_name())
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.quoted_name(),
            columns.join(", "),
            holders.join(", ")
        )
    };
    Ok(params.into_statement(sql))
}

/// `UPDATE` of the projected non-key columns, matched by key.
///
/// Columns absent from the projection keep their stored value, except the
/// element columns of an array field whose other elements are projected:
/// those are set to `NULL` so a shorter array replaces a longer one.
///
/// # Errors
///
/// Returns [`StoreError::Unstored`] if the projection has a path the table
/// has no column for, or an error if an identifier cannot be quoted.
pub fn update_statement(
    table: &Table,
    flat: &FlatMap,
    key: &Value,
    dialect: Dialect,
) -> StoreResult<Statement> {
    table.check_stored(flat)?;
    let mut params = Params::new(dialect);
    let mut sets = Vec::new();
    for path in table.columns().iter().filter(|p| *p != table.key()) {
        let value = match flat.get(path) {
            Some(value) => value.clone(),
            None if table.is_unused_element(path, flat) => Value::Null,
            None => continue,
        };
        let p = params.push(value);
        sets.push(format!("{} = {p}", quote_ident(&column_name(path))?));
    }
    let key_column = table.quoted_column(table.key())?;
    if sets.is_empty() {
        let p = params.push(key.clone());
        sets.push(format!("{key_column} = {p}"));
    }
    let p = params.push(key.clone());
    let sql = format!(
        "UPDATE {} SET {} WHERE {key_column} = {p}",
        table.quoted_name(),
        sets.join(", ")
    );
    Ok(params.into_statement(sql))
}

/// `DELETE` matched by key.
///
/// # Errors
///
/// Returns an error if an identifier cannot be quoted.
pub fn delete_statement(table: &Table, key: &Value, dialect: Dialect) -> StoreResult<Statement> {
    let mut params = Params::new(dialect);
    let p = params.push(key.clone());
    let sql = format!(
        "DELETE FROM {} WHERE {} = {p}",
        table.quoted_name(),
        table.quoted_column(table.key())?
    );
    Ok(params.into_statement(sql))
}

/// `SELECT` of one row by key. Columns are labelled with their paths.
///
/// # Errors
///
/// Returns an error if an identifier cannot be quoted.
pub fn select_one_statement(table: &Table, key: &Value, dialect: Dialect) -> StoreResult<Statement> {
    let mut params = Params::new(dialect);
    let p = params.push(key.clone());
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = {p} LIMIT 1",
        table.select_list()?,
        table.quoted_name(),
        table.quoted_column(table.key())?
    );
    Ok(params.into_statement(sql))
}

/// Filtered, sorted and windowed `SELECT`. Columns are labelled with their
/// paths. A sort on a field the table does not store is dropped.
///
/// # Errors
///
/// Returns an error if the filter names an unknown field.
pub fn select_statement(
    table: &Table,
    filter: &Filter,
    sort: Option<&SortField>,
    offset: u64,
    limit: Option<u64>,
    dialect: Dialect,
) -> StoreResult<Statement> {
    let mut params = Params::new(dialect);
    let mut sql = format!("SELECT {} FROM {}", table.select_list()?, table.quoted_name());
    sql.push_str(&generate_where(filter, table, &mut params)?);
    if let Some(sort) = sort {
        if table.has_column(&sort.field) {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                table.quoted_column(&sort.field)?,
                sort.direction.as_sql()
            ));
        } else {
            debug!(table = table.name(), field = %sort.field, "dropping sort on unknown column");
        }
    }
    match (limit, dialect) {
        (Some(limit), _) => sql.push_str(&format!(" LIMIT {limit}")),
        (None, Dialect::Sqlite) if offset > 0 => sql.push_str(" LIMIT -1"),
        (None, _) => {}
    }
    if offset > 0 {
        sql.push_str(&format!(" OFFSET {offset}"));
    }
    Ok(params.into_statement(sql))
}

/// `SELECT COUNT(*)` of the filtered rows, labelled `count`.
///
/// # Errors
///
/// Returns an error if the filter names an unknown field.
pub fn count_statement(table: &Table, filter: &Filter, dialect: Dialect) -> StoreResult<Statement> {
    let mut params = Params::new(dialect);
    let mut sql = format!("SELECT COUNT(*) AS \"count\" FROM {}", table.quoted_name());
    sql.push_str(&generate_where(filter, table, &mut params)?);
    Ok(params.into_statement(sql))
}

/// Distinct non-null values of a field, labelled `value`, in ascending
/// order. Array fields contribute the values of all element columns.
///
/// # Errors
///
/// Returns [`StoreError::UnknownColumn`] if the field is not stored.
pub fn distinct_statement(table: &Table, path: &str, dialect: Dialect) -> StoreResult<Statement> {
    let (columns, _) = table.backing_columns(path)?;
    let branches: Vec<String> = columns
        .iter()
        .map(|c| format!("SELECT {c} AS \"value\" FROM {}", table.quoted_name()))
        .collect();
    let sql = format!(
        "SELECT DISTINCT u.\"value\" FROM ({}) AS u WHERE u.\"value\" IS NOT NULL ORDER BY 1",
        branches.join(" UNION ALL ")
    );
    Ok(Params::new(dialect).into_statement(sql))
}

/// Smallest and largest value of a field, labelled `from` and `to`.
///
/// # Errors
///
/// Returns [`StoreError::UnknownColumn`] if the field is not stored.
pub fn extent_statement(table: &Table, path: &str, dialect: Dialect) -> StoreResult<Statement> {
    let column = table.quoted_column(path)?;
    let sql = format!(
        "SELECT MIN({column}) AS \"from\", MAX({column}) AS \"to\" FROM {}",
        table.quoted_name()
    );
    Ok(Params::new(dialect).into_statement(sql))
}

/// Number of filtered rows per non-null value of a field, labelled `name`
/// and `count`, most frequent first. Array fields count every element
/// column.
///
/// # Errors
///
/// Returns [`StoreError::UnknownColumn`] if the field or a filter field is
/// not stored.
pub fn facet_count_statement(
    table: &Table,
    path: &str,
    filter: &Filter,
    dialect: Dialect,
) -> StoreResult<Statement> {
    let (columns, _) = table.backing_columns(path)?;
    let mut params = Params::new(dialect);
    let selection = generate_where(filter, table, &mut params)?;
    let branches: Vec<String> = columns
        .iter()
        .map(|c| format!("SELECT {c} AS \"name\" FROM {}{selection}", table.quoted_name()))
        .collect();
    let sql = format!(
        "SELECT u.\"name\" AS \"name\", COUNT(*) AS \"count\" FROM ({}) AS u \
         WHERE u.\"name\" IS NOT NULL GROUP BY u.\"name\" ORDER BY 2 DESC, 1 ASC",
        branches.join(" UNION ALL ")
    );
    Ok(params.into_statement(sql))
}

/// `CREATE TABLE IF NOT EXISTS` with column types taken from a template
/// projection. Columns without a template value are `TEXT`.
///
/// # Errors
///
/// Returns an error if an identifier cannot be quoted.
pub fn create_table_statement(
    table: &Table,
    template: &FlatMap,
    dialect: Dialect,
) -> StoreResult<Statement> {
    let mut definitions = Vec::with_capacity(table.columns().len());
    for path in table.columns() {
        let kind = template
            .get(path)
            .map_or("TEXT", |value| dialect.column_type(value));
        let mut definition = format!("{} {kind}", quote_ident(&column_name(path))?);
        if path == table.key() {
            definition.push_str(" PRIMARY KEY");
        }
        definitions.push(definition);
    }
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        table.quoted_name(),
        definitions.join(", ")
    );
    Ok(Params::new(dialect).into_statement(sql))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use stowage_filter::DateRange;

    fn table() -> Table {
        Table::new(
            "task",
            "id",
            ["id", "title", "done", "createdAt", "tags.0", "tags.1"],
        )
        .unwrap()
    }

    #[test]
    fn identifiers() {
        assert_eq!(column_name("Owner.First-Name"), "owner_first_name");
        assert_eq!(quote_ident("task").unwrap(), "\"task\"");
        assert!(quote_ident("").is_err());
        assert!(quote_ident("a\"b").is_err());
    }

    #[test]
    fn table_rejects_colliding_columns() {
        let err = Table::new("t", "id", ["a.b", "a_b"]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidIdentifier(_)));
        let table = Table::new("t", "id", ["name"]).unwrap();
        assert_eq!(table.columns(), ["id".to_string(), "name".to_string()]);
    }

    #[test]
    fn element_columns_need_numeric_suffix() {
        let table = Table::new("t", "id", ["tags.0", "tags.1", "tagsx.0", "tags.name"]).unwrap();
        assert_eq!(table.element_columns("tags"), vec!["tags.0", "tags.1"]);
        assert!(table.element_columns("id").is_empty());
    }

    #[test]
    fn empty_filter_is_always_true() {
        let mut params = Params::new(Dialect::Postgres);
        let fragment = generate_where(&Filter::default(), &table(), &mut params).unwrap();
        assert_eq!(fragment, " WHERE 1 = 1");
        assert!(params.is_empty());
    }

    #[test]
    fn scalar_strategies() {
        let filter = Filter::new()
            .prop("title", Matcher::one(["a", "b"]))
            .prop("id", Matcher::none(["x"]))
            .boolean("done", true);
        let mut params = Params::new(Dialect::Postgres);
        let fragment = generate_where(&filter, &table(), &mut params).unwrap();
        assert_eq!(
            fragment,
            " WHERE (\"id\" IS NULL OR \"id\" NOT IN ($1)) AND \"title\" IN ($2, $3) AND \"done\" = $4"
        );
        assert_eq!(
            params.values(),
            &[Value::from("x"), Value::from("a"), Value::from("b"), Value::Bool(true)]
        );
    }

    #[test]
    fn all_strategy_on_scalar_column() {
        let filter = Filter::new().prop("title", Matcher::all(["a", "b"]));
        let mut params = Params::new(Dialect::Sqlite);
        let fragment = generate_where(&filter, &table(), &mut params).unwrap();
        assert_eq!(fragment, " WHERE (\"title\" = ?1 AND \"title\" = ?2)");
    }

    #[test]
    fn element_columns_for_lists() {
        let mut params = Params::new(Dialect::Postgres);
        let filter = Filter::new().list("tags", Matcher::all(["a", "b"]));
        let fragment = generate_where(&filter, &table(), &mut params).unwrap();
        assert_eq!(
            fragment,
            " WHERE ((\"tags_0\" = $1 OR \"tags_1\" = $1) AND (\"tags_0\" = $2 OR \"tags_1\" = $2))"
        );

        let mut params = Params::new(Dialect::Postgres);
        let filter = Filter::new().list("tags", Matcher::one(["a"]));
        let fragment = generate_where(&filter, &table(), &mut params).unwrap();
        assert_eq!(fragment, " WHERE (\"tags_0\" IN ($1) OR \"tags_1\" IN ($1))");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn dates_snap_to_day_boundaries() {
        let from = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap();
        let filter = Filter::new().date("createdAt", DateRange::new(from, to));
        let mut params = Params::new(Dialect::Postgres);
        let fragment = generate_where(&filter, &table(), &mut params).unwrap();
        assert_eq!(fragment, " WHERE \"createdat\" >= $1 AND \"createdat\" <= $2");
        assert_eq!(
            params.values()[0],
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            params.values()[1],
            Value::Timestamp(stowage_filter::end_of_day(to))
        );
    }

    #[test]
    fn unknown_filter_field_is_rejected() {
        let filter = Filter::new().prop("missing", Matcher::one(["x"]));
        let mut params = Params::new(Dialect::Postgres);
        let err = generate_where(&filter, &table(), &mut params).unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn insert_only_projected_columns() {
        let mut flat = FlatMap::new();
        flat.insert("id", Value::from("t1"));
        flat.insert("title", Value::from("write"));
        let stmt = insert_statement(&table(), &flat, Dialect::Postgres).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO \"task\" (\"id\", \"title\") VALUES ($1, $2)");
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn writes_reject_paths_without_column() {
        let mut flat = FlatMap::new();
        flat.insert("id", Value::from("t1"));
        flat.insert("tags.0", Value::from("a"));
        flat.insert("tags.1", Value::from("b"));
        flat.insert("tags.2", Value::from("c"));
        flat.insert("extra", Value::from("x"));

        let err = insert_statement(&table(), &flat, Dialect::Postgres).unwrap_err();
        match &err {
            StoreError::Unstored { table, paths } => {
                assert_eq!(table, "task");
                assert_eq!(paths, &["extra".to_string(), "tags.2".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_invalid_request());

        let err = update_statement(&table(), &flat, &Value::from("t1"), Dialect::Postgres).unwrap_err();
        assert!(matches!(err, StoreError::Unstored { .. }));
    }

    #[test]
    fn update_sets_only_projected_columns() {
        let mut flat = FlatMap::new();
        flat.insert("id", Value::from("t1"));
        flat.insert("title", Value::from("write"));
        let stmt = update_statement(&table(), &flat, &Value::from("t1"), Dialect::Postgres).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"task\" SET \"title\" = $1 WHERE \"id\" = $2"
        );
        assert_eq!(stmt.params, vec![Value::from("write"), Value::from("t1")]);
    }

    #[test]
    fn update_clears_unused_elements_of_projected_arrays() {
        let mut flat = FlatMap::new();
        flat.insert("id", Value::from("t1"));
        flat.insert("tags.0", Value::from("a"));
        let stmt = update_statement(&table(), &flat, &Value::from("t1"), Dialect::Sqlite).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"task\" SET \"tags_0\" = ?1, \"tags_1\" = ?2 WHERE \"id\" = ?3"
        );
        assert_eq!(stmt.params[1], Value::Null);
    }

    #[test]
    fn update_without_columns_still_matches_key() {
        let mut flat = FlatMap::new();
        flat.insert("id", Value::from("t1"));
        let stmt = update_statement(&table(), &flat, &Value::from("t1"), Dialect::Sqlite).unwrap();
        assert_eq!(stmt.sql, "UPDATE \"task\" SET \"id\" = ?1 WHERE \"id\" = ?2");
    }

    #[test]
    fn array_fields_come_from_element_columns() {
        assert_eq!(table().array_fields(), vec!["tags"]);
        let table = Table::new("t", "id", ["tags", "tags.0", "labels.0", "labels.1"]).unwrap();
        assert_eq!(table.array_fields(), vec!["labels"]);
    }

    #[test]
    fn select_window_and_sort() {
        let stmt = select_statement(
            &table(),
            &Filter::default(),
            Some(&SortField::parse("-createdAt").unwrap()),
            20,
            Some(10),
            Dialect::Postgres,
        )
        .unwrap();
        assert!(stmt.sql.starts_with("SELECT \"id\" AS \"id\", \"title\" AS \"title\""));
        assert!(stmt
            .sql
            .ends_with(" FROM \"task\" WHERE 1 = 1 ORDER BY \"createdat\" DESC LIMIT 10 OFFSET 20"));

        let stmt = select_statement(
            &table(),
            &Filter::default(),
            Some(&SortField::ascending("nope")),
            5,
            None,
            Dialect::Sqlite,
        )
        .unwrap();
        assert!(stmt.sql.ends_with(" WHERE 1 = 1 LIMIT -1 OFFSET 5"));
    }

    #[test]
    fn key_statements() {
        let key = Value::from("t1");
        let delete = delete_statement(&table(), &key, Dialect::Sqlite).unwrap();
        assert_eq!(delete.sql, "DELETE FROM \"task\" WHERE \"id\" = ?1");
        let one = select_one_statement(&table(), &key, Dialect::Sqlite).unwrap();
        assert!(one.sql.ends_with(" FROM \"task\" WHERE \"id\" = ?1 LIMIT 1"));
    }

    #[test]
    fn value_statements() {
        let distinct = distinct_statement(&table(), "tags", Dialect::Postgres).unwrap();
        assert_eq!(
            distinct.sql,
            "SELECT DISTINCT u.\"value\" FROM (SELECT \"tags_0\" AS \"value\" FROM \"task\" \
             UNION ALL SELECT \"tags_1\" AS \"value\" FROM \"task\") AS u \
             WHERE u.\"value\" IS NOT NULL ORDER BY 1"
        );
        let extent = extent_statement(&table(), "createdAt", Dialect::Postgres).unwrap();
        assert_eq!(
            extent.sql,
            "SELECT MIN(\"createdat\") AS \"from\", MAX(\"createdat\") AS \"to\" FROM \"task\""
        );
        assert!(extent_statement(&table(), "tags", Dialect::Postgres).is_err());

        let filter = Filter::new().boolean("done", false);
        let facets = facet_count_statement(&table(), "title", &filter, Dialect::Postgres).unwrap();
        assert_eq!(
            facets.sql,
            "SELECT u.\"name\" AS \"name\", COUNT(*) AS \"count\" FROM \
             (SELECT \"title\" AS \"name\" FROM \"task\" WHERE \"done\" = $1) AS u \
             WHERE u.\"name\" IS NOT NULL GROUP BY u.\"name\" ORDER BY 2 DESC, 1 ASC"
        );
        assert_eq!(facets.params, vec![Value::Bool(false)]);
    }

    #[test]
    fn create_table_uses_template_types() {
        let mut template = FlatMap::new();
        template.insert("id", Value::from(""));
        template.insert("done", Value::Bool(false));
        template.insert("createdAt", Value::Timestamp(stowage_filter::zero_timestamp()));
        let stmt = create_table_statement(&table(), &template, Dialect::Postgres).unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE TABLE IF NOT EXISTS \"task\" (\"id\" TEXT PRIMARY KEY, \"title\" TEXT, \
             \"done\" BOOLEAN, \"createdat\" TIMESTAMPTZ, \"tags_0\" TEXT, \"tags_1\" TEXT)"
        );
    }
}
