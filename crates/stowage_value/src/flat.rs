//! Flat projection of nested values.
//!
//! A [`FlatMap`] maps the dotted path of every scalar or timestamp leaf to
//! its value. Containers, nested records and absent values do not appear
//! in the projection, only their leaves do. The relational backend stores
//! one column per projected path.

use crate::error::ValueResult;
use crate::path::FieldPath;
use crate::ser::to_value;
use crate::value::Value;
use crate::walk::{walk, FieldNaming, MaxDepth, WalkConfig};
use serde::Serialize;
use std::collections::btree_map::{self, BTreeMap};

/// Path-to-leaf projection of a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatMap {
    entries: BTreeMap<String, Value>,
}

impl FlatMap {
    /// Creates an empty projection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects `value`, naming record fields with `naming`.
    ///
    /// The walk is unbounded, descends into containers, skips private
    /// fields and does not report the root record.
    pub fn project(value: &Value, naming: FieldNaming) -> Self {
        let config = WalkConfig::new()
            .naming(naming)
            .max_depth(MaxDepth::Unbounded);
        Self::project_with(value, &config)
    }

    /// Projects `value` under a caller-supplied walk configuration.
    pub fn project_with(value: &Value, config: &WalkConfig) -> Self {
        let mut entries = BTreeMap::new();
        walk(value, config, |state| {
            if state.current.is_leaf() {
                entries.insert(state.path.to_string(), state.current.clone());
            }
            true
        });
        Self { entries }
    }

    /// Serializes `item` and projects it with declared field names.
    ///
    /// # Errors
    ///
    /// Returns an error if `item` cannot be converted to a [`Value`].
    pub fn from_item<T: Serialize>(item: &T) -> ValueResult<Self> {
        Ok(Self::project(&to_value(item)?, FieldNaming::Declared))
    }

    /// Returns the leaf at `path`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.entries.get(path)
    }

    /// Inserts a leaf, returning the previous value at `path`.
    pub fn insert(&mut self, path: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(path.into(), value)
    }

    /// Returns true if `path` has a leaf.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Iterates over paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over entries in path order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    /// Returns the number of leaves.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no leaves.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuilds a nested value from the projected paths.
    ///
    /// Branches whose segments are the contiguous indexes `0..n` become
    /// arrays; all other branches become maps.
    pub fn unflatten(&self) -> Value {
        if let Some(value) = self.entries.get("") {
            if self.entries.len() == 1 {
                return value.clone();
            }
        }
        let mut root = Node::default();
        for (path, value) in &self.entries {
            let path = FieldPath::parse(path);
            let names: Vec<String> = path.segments().iter().map(ToString::to_string).collect();
            root.insert(&names, value.clone());
        }
        root.into_value()
    }
}

impl IntoIterator for FlatMap {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a FlatMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<(String, Value)> for FlatMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Default)]
struct Node {
    leaf: Option<Value>,
    children: BTreeMap<String, Node>,
}

impl Node {
    fn insert(&mut self, names: &[String], value: Value) {
        match names.split_first() {
            None => self.leaf = Some(value),
            Some((head, rest)) => self
                .children
                .entry(head.clone())
                .or_default()
                .insert(rest, value),
        }
    }

    fn into_value(self) -> Value {
        if self.children.is_empty() {
            return self.leaf.unwrap_or(Value::Null);
        }
        let mut indexed: Vec<(usize, Node)> = Vec::with_capacity(self.children.len());
        let mut named = Vec::new();
        for (name, child) in self.children {
            match name.parse::<usize>() {
                Ok(i) if name.bytes().all(|b| b.is_ascii_digit()) => indexed.push((i, child)),
                _ => named.push((name, child)),
            }
        }
        indexed.sort_by_key(|(i, _)| *i);
        let contiguous = indexed.iter().enumerate().all(|(pos, (i, _))| pos == *i);
        if named.is_empty() && contiguous {
            return Value::Array(indexed.into_iter().map(|(_, n)| n.into_value()).collect());
        }
        let mut pairs: Vec<(Value, Value)> = indexed
            .into_iter()
            .map(|(i, n)| (Value::Text(i.to_string()), n.into_value()))
            .collect();
        pairs.extend(
            named
                .into_iter()
                .map(|(name, n)| (Value::Text(name), n.into_value())),
        );
        Value::Map(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Field, Record};
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Address {
        city: String,
        zip: Option<String>,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Person {
        name: String,
        age: i64,
        tags: Vec<String>,
        address: Address,
        #[serde(with = "crate::timestamp")]
        created_at: DateTime<Utc>,
    }

    fn person() -> Person {
        Person {
            name: "Alice".into(),
            age: 30,
            tags: vec!["admin".into(), "ops".into()],
            address: Address {
                city: "Oslo".into(),
                zip: None,
            },
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn projects_leaves_only() {
        let flat = FlatMap::from_item(&person()).unwrap();
        let paths: Vec<_> = flat.paths().collect();
        assert_eq!(
            paths,
            vec!["address.city", "age", "createdAt", "name", "tags.0", "tags.1"]
        );
        assert_eq!(flat.get("tags.1"), Some(&Value::from("ops")));
        assert_eq!(
            flat.get("createdAt"),
            Some(&Value::Timestamp(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            ))
        );
        assert!(!flat.contains("address"));
        assert!(!flat.contains("address.zip"));
    }

    #[test]
    fn tag_naming_and_private_fields() {
        let value = Value::Record(
            Record::new()
                .with(Field::new("Email").with_tag("db", "email_address"), "a@b.c")
                .with(Field::private("secret"), "x"),
        );
        let flat = FlatMap::project(&value, FieldNaming::tag("db"));
        assert_eq!(flat.paths().collect::<Vec<_>>(), vec!["email_address"]);
    }

    #[test]
    fn ignoring_containers_drops_their_leaves() {
        let value = crate::to_value(&person()).unwrap();
        let flat = FlatMap::project_with(&value, &WalkConfig::new().ignore_containers(true));
        assert!(!flat.contains("tags.0"));
        assert!(flat.contains("name"));
    }

    #[test]
    fn unflatten_rebuilds_nesting() {
        let flat = FlatMap::from_item(&person()).unwrap();
        let value = flat.unflatten();
        assert_eq!(
            value.get("tags"),
            Some(&Value::Array(vec![Value::from("admin"), Value::from("ops")]))
        );
        assert_eq!(
            value.get("address").and_then(|a| a.get("city")),
            Some(&Value::from("Oslo"))
        );
    }

    #[test]
    fn sparse_indexes_stay_a_map() {
        let flat: FlatMap = vec![("slots.1".to_string(), Value::Integer(5))]
            .into_iter()
            .collect();
        assert_eq!(
            flat.unflatten().get("slots"),
            Some(&Value::Map(vec![(Value::from("1"), Value::Integer(5))]))
        );
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Integer),
            "[a-z]{0,6}".prop_map(Value::Text),
        ]
    }

    fn nested() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,5}", inner, 0..4).prop_map(|fields| {
                    let mut record = Record::new();
                    for (name, value) in fields {
                        record.push(Field::new(name), value);
                    }
                    Value::Record(record)
                }),
            ]
        })
    }

    fn record() -> impl Strategy<Value = Value> {
        prop::collection::btree_map("[a-z]{1,5}", nested(), 0..5).prop_map(|fields| {
            let mut record = Record::new();
            for (name, value) in fields {
                record.push(Field::new(name), value);
            }
            Value::Record(record)
        })
    }

    proptest! {
        #[test]
        fn projection_is_deterministic(value in record()) {
            let a = FlatMap::project(&value, FieldNaming::Declared);
            let b = FlatMap::project(&value, FieldNaming::Declared);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn projection_survives_unflatten(value in record()) {
            let flat = FlatMap::project(&value, FieldNaming::Declared);
            let again = FlatMap::project(&flat.unflatten(), FieldNaming::Declared);
            prop_assert_eq!(again, flat);
        }
    }
}
