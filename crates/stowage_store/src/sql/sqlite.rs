//! SQLite engine.

use super::{Dialect, SqlConnection, Statement};
use crate::error::{StoreError, StoreResult};
use crate::pool::ConnectionSource;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::path::PathBuf;
use std::time::Duration;
use stowage_value::timestamp::to_sortable_text;
use stowage_value::{Field, Record, Value};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    File(PathBuf),
    Memory(String),
}

/// Opens SQLite connections for a [`crate::Pool`].
///
/// In-memory sources use a named shared-cache database, so every pooled
/// connection of one source sees the same tables. The database lives as
/// long as at least one of its connections is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteSource {
    target: Target,
    setup: Vec<String>,
    busy_timeout: Duration,
}

impl SqliteSource {
    /// Source for a database file, created if missing.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::with_target(Target::File(path.into()))
    }

    /// Source for a fresh in-memory database.
    pub fn memory() -> Self {
        Self::with_target(Target::Memory(format!("stowage-{}", uuid::Uuid::new_v4())))
    }

    fn with_target(target: Target) -> Self {
        Self {
            target,
            setup: Vec::new(),
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Adds SQL run on every new connection, e.g. schema or pragmas.
    #[must_use]
    pub fn setup(mut self, sql: impl Into<String>) -> Self {
        self.setup.push(sql.into());
        self
    }

    /// Sets how long a connection waits on a locked database file.
    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

impl ConnectionSource for SqliteSource {
    type Connection = SqliteConnection;

    fn connect(&self) -> StoreResult<SqliteConnection> {
        let conn = match &self.target {
            Target::File(path) => Connection::open(path)?,
            Target::Memory(name) => Connection::open_with_flags(
                format!("file:{name}?mode=memory&cache=shared"),
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
        };
        conn.busy_timeout(self.busy_timeout)?;
        for sql in &self.setup {
            conn.execute_batch(sql)?;
        }
        Ok(SqliteConnection { conn })
    }
}

/// A SQLite connection speaking `?n` placeholders.
///
/// Booleans are stored as integers and timestamps as fixed-width UTC
/// text, so comparisons on both behave like the native types.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    /// Wraps an open connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot open the database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Runs several `;`-separated statements without parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite rejects a statement.
    pub fn execute_batch(&mut self, sql: &str) -> StoreResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn bind(statement: &Statement) -> StoreResult<Vec<SqlValue>> {
        statement.params.iter().map(to_sql).collect()
    }
}

impl SqlConnection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute(&mut self, statement: &Statement) -> StoreResult<u64> {
        debug!(sql = %statement.sql, params = statement.params.len(), "execute");
        let params = Self::bind(statement)?;
        let mut prepared = self.conn.prepare_cached(&statement.sql)?;
        let affected = prepared.execute(params_from_iter(params))?;
        Ok(affected as u64)
    }

    fn query(&mut self, statement: &Statement) -> StoreResult<Vec<Record>> {
        debug!(sql = %statement.sql, params = statement.params.len(), "query");
        let params = Self::bind(statement)?;
        let mut prepared = self.conn.prepare_cached(&statement.sql)?;
        let names: Vec<String> = prepared
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let mut rows = prepared.query(params_from_iter(params))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::with_capacity(names.len());
            for (index, name) in names.iter().enumerate() {
                record.push(Field::new(name.as_str()), from_sql(row.get_ref(index)?)?);
            }
            out.push(record);
        }
        Ok(out)
    }
}

fn to_sql(value: &Value) -> StoreResult<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(n) => SqlValue::Integer(*n),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Timestamp(at) => SqlValue::Text(to_sortable_text(at)),
        Value::Variant(_, inner) => return to_sql(inner),
        Value::Array(_) | Value::Map(_) | Value::Record(_) => {
            return Err(StoreError::unsupported(
                "composite values cannot be bound as SQL parameters",
            ))
        }
    })
}

fn from_sql(value: ValueRef<'_>) -> StoreResult<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| StoreError::backend(format!("column is not UTF-8: {e}")))?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Pool, PoolConfig};
    use crate::sql::Params;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS item (id TEXT PRIMARY KEY, done INTEGER, at TEXT)";

    fn insert(conn: &mut SqliteConnection, id: &str, done: bool, day: u32) {
        let mut params = Params::new(Dialect::Sqlite);
        let sql = format!(
            "INSERT INTO item (id, done, at) VALUES ({}, {}, {})",
            params.push(Value::from(id)),
            params.push(Value::Bool(done)),
            params.push(Value::Timestamp(Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap())),
        );
        assert_eq!(conn.execute(&params.into_statement(sql)).unwrap(), 1);
    }

    #[test]
    fn file_database_round_trip() {
        let dir = TempDir::new().unwrap();
        let source = SqliteSource::file(dir.path().join("items.db")).setup(SCHEMA);
        let mut conn = source.connect().unwrap();
        insert(&mut conn, "a", true, 1);
        insert(&mut conn, "b", false, 2);

        let mut params = Params::new(Dialect::Sqlite);
        let sql = format!(
            "SELECT id, done, at FROM item WHERE done = {} ORDER BY id",
            params.push(Value::Bool(true))
        );
        let rows = conn.query(&params.into_statement(sql)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&Value::from("a")));
        assert_eq!(rows[0].get("done"), Some(&Value::Integer(1)));
        assert_eq!(
            rows[0].get("at"),
            Some(&Value::from("2024-03-01T00:00:00.000000000Z"))
        );

        let reopened = source.connect().unwrap();
        drop(reopened);
    }

    #[test]
    fn timestamps_compare_as_text() {
        let mut conn = SqliteSource::memory().setup(SCHEMA).connect().unwrap();
        insert(&mut conn, "a", true, 1);
        insert(&mut conn, "b", true, 9);
        insert(&mut conn, "c", true, 20);
        let mut params = Params::new(Dialect::Sqlite);
        let lower = params.push(Value::Timestamp(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()));
        let sql = format!("SELECT id FROM item WHERE at >= {lower} ORDER BY at");
        let rows = conn.query(&params.into_statement(sql)).unwrap();
        let ids: Vec<_> = rows.iter().filter_map(|r| r.get("id").cloned()).collect();
        assert_eq!(ids, vec![Value::from("b"), Value::from("c")]);
    }

    #[test]
    fn pooled_memory_connections_share_tables() {
        let pool = Pool::new(SqliteSource::memory().setup(SCHEMA), PoolConfig::new().max_size(2));
        let mut first = pool.get().unwrap();
        let mut second = pool.get().unwrap();
        insert(&mut first, "a", false, 1);
        let rows = second
            .query(&Params::new(Dialect::Sqlite).into_statement("SELECT COUNT(*) AS n FROM item".into()))
            .unwrap();
        assert_eq!(rows[0].get("n"), Some(&Value::Integer(1)));
    }

    #[test]
    fn composite_parameters_are_rejected() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        let stmt = Statement {
            sql: "INSERT INTO item (id) VALUES (?1)".into(),
            params: vec![Value::Array(vec![])],
        };
        assert!(matches!(conn.execute(&stmt), Err(StoreError::Unsupported(_))));
    }

    #[test]
    fn engine_errors_surface() {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        let stmt = Params::new(Dialect::Sqlite).into_statement("SELECT * FROM missing".into());
        assert!(matches!(conn.query(&stmt), Err(StoreError::Sqlite(_))));
    }
}
