//! Relational side: statement compilation and the connection contract.
//!
//! Record types map to one table each. Columns are the flat projection
//! paths of the type, normalized by [`column_name`]. All values travel as
//! numbered positional parameters; statement text only ever contains
//! quoted identifiers and placeholders.

mod compile;
mod row;
mod sqlite;

pub use compile::{
    column_name, count_statement, create_table_statement, delete_statement,
    distinct_statement, extent_statement, facet_count_statement, generate_where,
    insert_statement, quote_ident, select_one_statement, select_statement, update_statement,
    Table,
};
pub use row::{coerce, rehydrate};
pub use sqlite::{SqliteConnection, SqliteSource};

use crate::error::StoreResult;
use serde::{Deserialize, Serialize};
use stowage_value::{Record, Value};

/// Placeholder syntax of a SQL engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `$1`, `$2`, ...
    #[default]
    Postgres,
    /// `?1`, `?2`, ...
    Sqlite,
}

impl Dialect {
    /// Renders the placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
        }
    }

    /// Column type used by [`create_table_statement`] for a template value.
    pub fn column_type(self, template: &Value) -> &'static str {
        match (self, template) {
            (Dialect::Postgres, Value::Bool(_)) => "BOOLEAN",
            (Dialect::Postgres, Value::Integer(_)) => "BIGINT",
            (Dialect::Postgres, Value::Float(_)) => "DOUBLE PRECISION",
            (Dialect::Postgres, Value::Bytes(_)) => "BYTEA",
            (Dialect::Postgres, Value::Timestamp(_)) => "TIMESTAMPTZ",
            (Dialect::Sqlite, Value::Bool(_) | Value::Integer(_)) => "INTEGER",
            (Dialect::Sqlite, Value::Float(_)) => "REAL",
            (Dialect::Sqlite, Value::Bytes(_)) => "BLOB",
            _ => "TEXT",
        }
    }
}

/// Positional parameters collected while compiling a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    dialect: Dialect,
    values: Vec<Value>,
}

impl Params {
    /// Creates an empty parameter list.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            values: Vec::new(),
        }
    }

    /// Appends a value and returns its placeholder.
    pub fn push(&mut self, value: Value) -> String {
        self.values.push(value);
        self.dialect.placeholder(self.values.len())
    }

    /// Returns the dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Returns the collected values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no value was collected.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pairs the parameters with statement text.
    pub fn into_statement(self, sql: String) -> Statement {
        Statement {
            sql,
            params: self.values,
        }
    }
}

/// SQL text with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Statement text.
    pub sql: String,
    /// Parameter values, in placeholder order.
    pub params: Vec<Value>,
}

/// A connection to a relational engine.
///
/// Result rows are [`Record`]s whose field names are the column labels of
/// the statement.
pub trait SqlConnection: Send {
    /// Placeholder syntax expected by this engine.
    fn dialect(&self) -> Dialect;

    /// Executes a statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the statement.
    fn execute(&mut self, statement: &Statement) -> StoreResult<u64>;

    /// Runs a query and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the query.
    fn query(&mut self, statement: &Statement) -> StoreResult<Vec<Record>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_per_dialect() {
        let mut pg = Params::new(Dialect::Postgres);
        assert_eq!(pg.push(Value::from(1)), "$1");
        assert_eq!(pg.push(Value::from(2)), "$2");
        let mut lite = Params::new(Dialect::Sqlite);
        assert_eq!(lite.push(Value::Null), "?1");
        assert_eq!(lite.len(), 1);
    }

    #[test]
    fn column_types() {
        assert_eq!(Dialect::Postgres.column_type(&Value::Bool(false)), "BOOLEAN");
        assert_eq!(Dialect::Sqlite.column_type(&Value::Bool(false)), "INTEGER");
        assert_eq!(Dialect::Sqlite.column_type(&Value::from("")), "TEXT");
    }
}
