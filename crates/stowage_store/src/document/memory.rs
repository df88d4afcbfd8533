//! In-memory document store.

use super::pipeline::{Accumulator, Stage};
use super::selector::{Condition, Selector};
use super::{DocumentConnection, FindOptions};
use crate::error::StoreResult;
use crate::pool::ConnectionSource;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use stowage_filter::SortDirection;
use stowage_value::Value;
use tracing::trace;

/// An in-memory document store.
///
/// Evaluates [`Selector`]s and pipelines with document-store semantics:
/// dotted paths reach into nested documents and across arrays, and a
/// condition on an array field matches when any element matches.
///
/// Clones share the same collections, so the store is its own
/// [`ConnectionSource`]: each pooled "connection" is a clone.
///
/// # Example
///
/// ```rust
/// use stowage_store::{DocumentConnection, InMemoryDocumentStore, Selector};
/// use stowage_value::{Record, Value};
///
/// let mut store = InMemoryDocumentStore::new();
/// store
///     .insert_one("task", Value::Record(Record::new().field("id", "t1")))
///     .unwrap();
/// let found = store
///     .find_one("task", &Selector::eq("id", Value::from("t1")))
///     .unwrap();
/// assert!(found.is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<BTreeMap<String, Vec<Value>>>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents in a collection.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, Vec::len)
    }

    /// Returns the collection names.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }

    /// Removes every collection.
    pub fn clear(&self) {
        self.collections.write().clear();
    }

    fn matching(&self, collection: &str, selector: Option<&Selector>) -> Vec<Value> {
        self.collections
            .read()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| selector.map_or(true, |s| matches(s, doc)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ConnectionSource for InMemoryDocumentStore {
    type Connection = InMemoryDocumentStore;

    fn connect(&self) -> StoreResult<Self::Connection> {
        Ok(self.clone())
    }
}

impl DocumentConnection for InMemoryDocumentStore {
    fn insert_one(&mut self, collection: &str, document: Value) -> StoreResult<()> {
        trace!(collection, "insert");
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }

    fn replace_one(
        &mut self,
        collection: &str,
        selector: &Selector,
        document: Value,
    ) -> StoreResult<u64> {
        let mut collections = self.collections.write();
        let slot = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| matches(selector, doc)));
        Ok(match slot {
            Some(slot) => {
                *slot = document;
                1
            }
            None => 0,
        })
    }

    fn delete_one(&mut self, collection: &str, selector: &Selector) -> StoreResult<u64> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        Ok(match docs.iter().position(|doc| matches(selector, doc)) {
            Some(index) => {
                docs.remove(index);
                1
            }
            None => 0,
        })
    }

    fn find_one(&mut self, collection: &str, selector: &Selector) -> StoreResult<Option<Value>> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| matches(selector, doc)).cloned()))
    }

    fn find(
        &mut self,
        collection: &str,
        selector: Option<&Selector>,
        options: &FindOptions,
    ) -> StoreResult<Vec<Value>> {
        let mut docs = self.matching(collection, selector);
        if let Some(sort) = &options.sort {
            docs.sort_by(|a, b| {
                let ord = sort_key(a, &sort.field).cmp_sort(&sort_key(b, &sort.field));
                match sort.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }
        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(docs.into_iter().skip(skip).take(limit).collect())
    }

    fn count(&mut self, collection: &str, selector: Option<&Selector>) -> StoreResult<u64> {
        let collections = self.collections.read();
        let count = collections.get(collection).map_or(0, |docs| {
            docs.iter()
                .filter(|doc| selector.map_or(true, |s| matches(s, doc)))
                .count()
        });
        Ok(count as u64)
    }

    fn distinct(
        &mut self,
        collection: &str,
        field: &str,
        selector: Option<&Selector>,
    ) -> StoreResult<Vec<Value>> {
        let mut seen: Vec<Value> = Vec::new();
        for doc in self.matching(collection, selector) {
            for value in resolve(&doc, field) {
                let elements = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for element in elements {
                    if !element.is_null() && !seen.iter().any(|s| s.loose_eq(element)) {
                        seen.push(element.clone());
                    }
                }
            }
        }
        seen.sort_by(Value::cmp_sort);
        Ok(seen)
    }

    fn aggregate(&mut self, collection: &str, pipeline: &[Stage]) -> StoreResult<Vec<Value>> {
        trace!(collection, stages = pipeline.len(), "aggregate");
        Ok(run_pipeline(self.matching(collection, None), pipeline))
    }
}

fn split(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    }
}

/// Values reached by a dotted path. Non-numeric segments fan out across
/// arrays.
fn resolve<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut out = Vec::new();
    resolve_into(doc, &split(path), &mut out);
    out
}

fn resolve_into<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Record(_) | Value::Map(_) => {
            if let Some(child) = value.get(head) {
                resolve_into(child, rest, out);
            }
        }
        Value::Variant(_, inner) => resolve_into(inner, segments, out),
        Value::Array(items) => match head.parse::<usize>() {
            Ok(index) => {
                if let Some(item) = items.get(index) {
                    resolve_into(item, rest, out);
                }
            }
            Err(_) => {
                for item in items {
                    resolve_into(item, segments, out);
                }
            }
        },
        _ => {}
    }
}

/// Candidate values for a condition: each resolved value plus the
/// elements of resolved arrays.
fn candidates<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut out = Vec::new();
    for value in resolve(doc, path) {
        if let Value::Array(items) = value {
            out.extend(items.iter());
        }
        out.push(value);
    }
    out
}

fn matches(selector: &Selector, doc: &Value) -> bool {
    match selector {
        Selector::And(parts) => parts.iter().all(|part| matches(part, doc)),
        Selector::Field { path, condition } => {
            let values = candidates(doc, path);
            let hit = |wanted: &Value| values.iter().any(|v| v.loose_eq(wanted));
            match condition {
                Condition::Eq(wanted) if wanted.is_null() => {
                    values.is_empty() || values.iter().any(|v| v.is_null())
                }
                Condition::Eq(wanted) => hit(wanted),
                Condition::In(wanted) => wanted.iter().any(hit),
                Condition::All(wanted) => !wanted.is_empty() && wanted.iter().all(hit),
                Condition::Nin(wanted) => !wanted.iter().any(hit),
                Condition::Range { gte, lte } => values.iter().any(|v| {
                    matches!(v.compare(gte), Some(Ordering::Greater | Ordering::Equal))
                        && matches!(v.compare(lte), Some(Ordering::Less | Ordering::Equal))
                }),
            }
        }
    }
}

fn sort_key(doc: &Value, path: &str) -> Value {
    resolve(doc, path).first().map_or(Value::Null, |v| (*v).clone())
}

fn set_path(doc: &mut Value, segments: &[&str], new: Value) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        *doc = new;
        return true;
    };
    let child = match doc {
        Value::Record(record) => record.get_mut(head),
        Value::Map(pairs) => pairs
            .iter_mut()
            .find(|(k, _)| k.as_text() == Some(*head))
            .map(|(_, v)| v),
        Value::Array(items) => head.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        Value::Variant(_, inner) => return set_path(inner, segments, new),
        _ => None,
    };
    child.is_some_and(|child| set_path(child, rest, new))
}

fn run_pipeline(docs: Vec<Value>, stages: &[Stage]) -> Vec<Value> {
    stages
        .iter()
        .fold(docs, |docs, stage| run_stage(docs, stage))
}

fn count_value(n: usize) -> Value {
    Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
}

fn run_stage(docs: Vec<Value>, stage: &Stage) -> Vec<Value> {
    match stage {
        Stage::Match(selector) => docs
            .into_iter()
            .filter(|doc| selector.as_ref().map_or(true, |s| matches(s, doc)))
            .collect(),
        Stage::Group(accumulators) => {
            if docs.is_empty() {
                return Vec::new();
            }
            let mut fields = vec![(Value::from("_id"), Value::Null)];
            for (name, acc) in accumulators {
                let (path, keep) = match acc {
                    Accumulator::Min(path) => (path, Ordering::Less),
                    Accumulator::Max(path) => (path, Ordering::Greater),
                };
                let mut best: Option<&Value> = None;
                for value in docs.iter().flat_map(|doc| resolve(doc, path)) {
                    if value.is_null() {
                        continue;
                    }
                    if best.map_or(true, |b| value.cmp_sort(b) == keep) {
                        best = Some(value);
                    }
                }
                fields.push((
                    Value::from(name.as_str()),
                    best.cloned().unwrap_or(Value::Null),
                ));
            }
            vec![Value::Map(fields)]
        }
        Stage::Unwind(path) => {
            let segments = split(path);
            let mut out = Vec::with_capacity(docs.len());
            for doc in docs {
                let target = resolve(&doc, path).first().map(|v| (*v).clone());
                match target {
                    Some(Value::Array(items)) => {
                        for item in items {
                            let mut copy = doc.clone();
                            set_path(&mut copy, &segments, item);
                            out.push(copy);
                        }
                    }
                    Some(Value::Null) | None => {}
                    Some(_) => out.push(doc),
                }
            }
            out
        }
        Stage::SortByCount(path) => {
            let mut groups: Vec<(Value, usize)> = Vec::new();
            for doc in &docs {
                let key = sort_key(doc, path);
                match groups.iter_mut().find(|(k, _)| k.loose_eq(&key)) {
                    Some((_, n)) => *n += 1,
                    None => groups.push((key, 1)),
                }
            }
            groups.sort_by(|(ka, na), (kb, nb)| nb.cmp(na).then_with(|| ka.cmp_sort(kb)));
            groups
                .into_iter()
                .map(|(key, n)| {
                    Value::Map(vec![
                        (Value::from("_id"), key),
                        (Value::from("count"), count_value(n)),
                    ])
                })
                .collect()
        }
        Stage::Facet(facets) => {
            let fields = facets
                .iter()
                .map(|(name, stages)| {
                    (
                        Value::from(name.as_str()),
                        Value::Array(run_pipeline(docs.clone(), stages)),
                    )
                })
                .collect();
            vec![Value::Map(fields)]
        }
    }
}
