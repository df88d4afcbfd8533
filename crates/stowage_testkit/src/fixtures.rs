//! Sample record types, seed data and dispatcher helpers.
//!
//! [`Task`] exercises scalar, boolean, array and timestamp fields; [`Note`]
//! exercises nested records. [`TestCrud`] wraps a dispatcher over either
//! engine with both types registered and their storage prepared.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use stowage_core::{Crud, CrudConfig, DataStorage, DocumentStorage, Item, RegistryBuilder, SqlStorage, TypeRegistry};
use stowage_store::{InMemoryDocumentStore, PoolConfig, SqliteSource};
use stowage_value::Value;
use tempfile::TempDir;

/// Most tags a [`Task`] keeps in relational storage.
pub const MAX_TASK_TAGS: usize = 3;

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Key.
    pub id: String,
    /// Short description.
    pub title: String,
    /// Workflow state: `open`, `review` or `closed`.
    pub status: String,
    /// Completion flag.
    pub done: bool,
    /// Priority, higher first.
    pub priority: i64,
    /// Free-form labels.
    pub tags: Vec<String>,
    /// Creation time.
    #[serde(with = "stowage_value::timestamp")]
    pub created_at: DateTime<Utc>,
    /// Creator.
    pub created_by: String,
    /// Last modification time.
    #[serde(with = "stowage_value::timestamp")]
    pub modified_at: DateTime<Utc>,
    /// Last modifier.
    pub modified_by: String,
}

impl Item for Task {
    const DATA_TYPE: &'static str = "task";
    const KEY_FIELD: &'static str = "id";

    fn instantiate(by: &str, at: DateTime<Utc>) -> Self {
        Task {
            id: uuid::Uuid::new_v4().to_string(),
            title: String::new(),
            status: "open".to_string(),
            done: false,
            priority: 0,
            tags: Vec::new(),
            created_at: at,
            created_by: by.to_string(),
            modified_at: at,
            modified_by: by.to_string(),
        }
    }

    fn key(&self) -> Value {
        Value::from(self.id.as_str())
    }

    fn set_mod_info(&mut self, at: DateTime<Utc>, by: &str) {
        self.modified_at = at;
        self.modified_by = by.to_string();
    }

    fn columns() -> Option<Vec<String>> {
        let mut columns: Vec<String> = ["id", "title", "status", "done", "priority"]
            .into_iter()
            .map(String::from)
            .collect();
        columns.extend((0..MAX_TASK_TAGS).map(|i| format!("tags.{i}")));
        columns.extend(
            ["createdAt", "createdBy", "modifiedAt", "modifiedBy"]
                .into_iter()
                .map(String::from),
        );
        Some(columns)
    }
}

/// Owner of a [`Note`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
}

/// A note with a nested owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Key.
    pub id: String,
    /// Body text.
    pub text: String,
    /// Owner.
    pub owner: Owner,
    /// Pinned notes show first.
    pub pinned: bool,
    /// Creation time.
    #[serde(with = "stowage_value::timestamp")]
    pub created_at: DateTime<Utc>,
    /// Creator.
    pub created_by: String,
    /// Last modification time.
    #[serde(with = "stowage_value::timestamp")]
    pub modified_at: DateTime<Utc>,
    /// Last modifier.
    pub modified_by: String,
}

impl Item for Note {
    const DATA_TYPE: &'static str = "note";
    const KEY_FIELD: &'static str = "id";

    fn instantiate(by: &str, at: DateTime<Utc>) -> Self {
        Note {
            id: uuid::Uuid::new_v4().to_string(),
            text: String::new(),
            owner: Owner {
                name: by.to_string(),
                email: String::new(),
            },
            pinned: false,
            created_at: at,
            created_by: by.to_string(),
            modified_at: at,
            modified_by: by.to_string(),
        }
    }

    fn key(&self) -> Value {
        Value::from(self.id.as_str())
    }

    fn set_mod_info(&mut self, at: DateTime<Utc>, by: &str) {
        self.modified_at = at;
        self.modified_by = by.to_string();
    }
}

/// A UTC timestamp, for fixtures.
pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid fixture timestamp")
}

fn task(
    id: &str,
    title: &str,
    status: &str,
    priority: i64,
    tags: &[&str],
    created_at: DateTime<Utc>,
    by: &str,
) -> Task {
    Task {
        id: id.to_string(),
        title: title.to_string(),
        status: status.to_string(),
        done: status == "closed",
        priority,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        created_at,
        created_by: by.to_string(),
        modified_at: created_at,
        modified_by: by.to_string(),
    }
}

/// Five tasks spread over January and February 2024.
///
/// | id | status | priority | tags | created |
/// |---|---|---|---|---|
/// | t1 | open | 2 | docs | 2024-01-10 |
/// | t2 | open | 5 | bug, store | 2024-01-15 |
/// | t3 | closed | 3 | release | 2024-02-01 |
/// | t4 | review | 4 | store, sql | 2024-02-03 |
/// | t5 | closed | 1 | | 2024-02-20 |
pub fn sample_tasks() -> Vec<Task> {
    vec![
        task("t1", "Write docs", "open", 2, &["docs"], utc(2024, 1, 10, 9, 0), "ann"),
        task("t2", "Fix pool timeout", "open", 5, &["bug", "store"], utc(2024, 1, 15, 14, 30), "bob"),
        task("t3", "Release 0.3", "closed", 3, &["release"], utc(2024, 2, 1, 8, 0), "ann"),
        task("t4", "Review compiler", "review", 4, &["store", "sql"], utc(2024, 2, 3, 17, 45), "cy"),
        task("t5", "Tidy imports", "closed", 1, &[], utc(2024, 2, 20, 11, 15), "bob"),
    ]
}

/// Two notes by different owners.
pub fn sample_notes() -> Vec<Note> {
    let at = utc(2024, 3, 1, 12, 0);
    vec![
        Note {
            id: "n1".to_string(),
            text: "pool sizing".to_string(),
            owner: Owner {
                name: "ann".to_string(),
                email: "ann@example.com".to_string(),
            },
            pinned: true,
            created_at: at,
            created_by: "ann".to_string(),
            modified_at: at,
            modified_by: "ann".to_string(),
        },
        Note {
            id: "n2".to_string(),
            text: "sql dialects".to_string(),
            owner: Owner {
                name: "bob".to_string(),
                email: "bob@example.com".to_string(),
            },
            pinned: false,
            created_at: at,
            created_by: "bob".to_string(),
            modified_at: at,
            modified_by: "bob".to_string(),
        },
    ]
}

/// A sealed registry holding [`Task`] and [`Note`].
pub fn sample_registry() -> Arc<TypeRegistry> {
    RegistryBuilder::new()
        .register::<Task>()
        .and_then(|b| b.register::<Note>())
        .expect("sample types register")
        .seal()
}

/// A dispatcher with prepared storage and automatic cleanup.
pub struct TestCrud<S: DataStorage> {
    /// The dispatcher.
    pub crud: Crud<S>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl<S: DataStorage> TestCrud<S> {
    fn prepared(storage: S, temp_dir: Option<TempDir>) -> Self {
        let crud = Crud::new(sample_registry(), storage, CrudConfig::default());
        crud.setup().expect("Failed to prepare storage");
        Self {
            crud,
            _temp_dir: temp_dir,
        }
    }

    /// Stores [`sample_tasks`] and [`sample_notes`].
    #[must_use]
    pub fn seeded(self) -> Self {
        for task in sample_tasks() {
            self.crud.create_item(&task).expect("Failed to seed task");
        }
        for note in sample_notes() {
            self.crud.create_item(&note).expect("Failed to seed note");
        }
        self
    }

    /// Stores `tasks`.
    #[must_use]
    pub fn with_tasks(self, tasks: &[Task]) -> Self {
        for task in tasks {
            self.crud.create_item(task).expect("Failed to store task");
        }
        self
    }
}

impl TestCrud<DocumentStorage<InMemoryDocumentStore>> {
    /// Creates a dispatcher over a fresh in-memory document store.
    pub fn memory() -> Self {
        let storage = DocumentStorage::new(InMemoryDocumentStore::new(), PoolConfig::default());
        Self::prepared(storage, None)
    }

    /// Returns the underlying document store.
    pub fn store(&self) -> &InMemoryDocumentStore {
        self.crud.storage().pool().source()
    }
}

impl TestCrud<SqlStorage<SqliteSource>> {
    /// Creates a dispatcher over a fresh in-memory SQLite database.
    pub fn sqlite() -> Self {
        let storage = SqlStorage::new(SqliteSource::memory(), PoolConfig::default());
        Self::prepared(storage, None)
    }

    /// Creates a dispatcher over a SQLite file in a temporary directory.
    pub fn sqlite_file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = SqliteSource::file(temp_dir.path().join("stowage.db"));
        let storage = SqlStorage::new(source, PoolConfig::default());
        Self::prepared(storage, Some(temp_dir))
    }

    /// Returns the database path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().join("stowage.db"))
    }
}

impl<S: DataStorage> std::ops::Deref for TestCrud<S> {
    type Target = Crud<S>;

    fn deref(&self) -> &Self::Target {
        &self.crud
    }
}

/// Field values of `records` at `path`, in order.
pub fn field_of(records: &[Value], path: &str) -> Vec<Value> {
    records
        .iter()
        .map(|r| r.get(path).cloned().unwrap_or(Value::Null))
        .collect()
}

/// Text keys of `records`, in order.
pub fn ids_of(records: &[Value]) -> Vec<String> {
    field_of(records, "id")
        .iter()
        .map(|v| v.as_text().unwrap_or_default().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_filter::Filter;

    #[test]
    fn task_columns_cover_projection() {
        let projected = stowage_value::FlatMap::from_item(&sample_tasks()[1]).unwrap();
        let columns = Task::columns().unwrap();
        for path in projected.paths() {
            assert!(columns.iter().any(|c| c == path), "missing column {path}");
        }
    }

    fn holds_samples<S: DataStorage>(crud: &Crud<S>) {
        assert_eq!(crud.count("task", &Filter::new()).unwrap(), 5, "{}", crud.storage().name());
        assert_eq!(crud.count("note", &Filter::new()).unwrap(), 2, "{}", crud.storage().name());
    }

    #[test]
    fn seeded_engines_hold_samples() {
        holds_samples(&TestCrud::memory().seeded().crud);
        holds_samples(&TestCrud::sqlite().seeded().crud);
    }

    #[test]
    fn file_database_lives_in_temp_dir() {
        let crud = TestCrud::sqlite_file().seeded();
        let path = crud.path().unwrap();
        assert!(path.exists());
        assert_eq!(crud.count("task", &Filter::new()).unwrap(), 5);
    }
}
