//! Filter specs and facet results.
//!
//! A filter spec describes one filterable field of a record type, as shown
//! to the user. Backends use the specs to resolve the candidate values for
//! each field ([`FieldValues`]) and per-value counts ([`FacetCount`]).

use crate::error::{FilterError, FilterResult};
use crate::filter::DateRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stowage_value::Value;

/// Kind of a filterable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterType {
    /// Scalar field with categorical values.
    #[serde(rename = "prop")]
    Prop,
    /// Array field; values are the array elements.
    #[serde(rename = "array", alias = "array'")]
    Array,
    /// Date field filtered by range.
    #[serde(rename = "dateRange")]
    DateRange,
    /// Boolean field.
    #[serde(rename = "boolean")]
    Boolean,
    /// Free-text search field.
    #[serde(rename = "search")]
    Search,
    /// Constant value.
    #[serde(rename = "constant")]
    Constant,
    /// Static value.
    #[serde(rename = "static")]
    Static,
}

impl FilterType {
    /// Returns true for kinds whose values are enumerated by the backend.
    pub fn is_categorical(self) -> bool {
        matches!(self, FilterType::Prop | FilterType::Array)
    }
}

/// One filterable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Stored field path.
    pub field: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Field kind.
    #[serde(rename = "type")]
    pub kind: FilterType,
}

impl FilterSpec {
    /// Creates a spec whose display name equals the field.
    pub fn new(field: impl Into<String>, kind: FilterType) -> Self {
        let field = field.into();
        Self {
            name: field.clone(),
            field,
            kind,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Ordered list of filter specs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpecList(Vec<FilterSpec>);

impl FilterSpecList {
    /// Creates a list.
    pub fn new(specs: Vec<FilterSpec>) -> Self {
        Self(specs)
    }

    /// Decodes a spec list from JSON. Empty input yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidSpec`] if the JSON is malformed.
    pub fn from_json(json: &str) -> FilterResult<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| FilterError::invalid_spec(e.to_string()))
    }

    /// Iterates over the specs.
    pub fn iter(&self) -> std::slice::Iter<'_, FilterSpec> {
        self.0.iter()
    }

    /// Returns the number of specs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Specs other than the one for `field`.
    pub fn others<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FilterSpec> + 'a {
        self.0.iter().filter(move |spec| spec.field != field)
    }
}

impl From<Vec<FilterSpec>> for FilterSpecList {
    fn from(specs: Vec<FilterSpec>) -> Self {
        Self(specs)
    }
}

impl<'a> IntoIterator for &'a FilterSpecList {
    type Item = &'a FilterSpec;
    type IntoIter = std::slice::Iter<'a, FilterSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A value of a field and how many records carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetCount {
    /// The field value.
    pub name: Value,
    /// Number of matching records (array elements for array fields).
    pub count: u64,
}

impl FacetCount {
    /// Creates a facet count.
    pub fn new(name: impl Into<Value>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// Candidate values of one filterable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValues {
    /// Distinct values of a prop or array field.
    Values(Vec<Value>),
    /// Extent of a date field.
    Range(DateRange),
}

/// Candidate values keyed by field path.
pub type FilterValues = BTreeMap<String, FieldValues>;

/// Facet counts keyed by field path, most frequent value first.
pub type FacetCounts = BTreeMap<String, Vec<FacetCount>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_spec_list() {
        let specs = FilterSpecList::from_json(
            r#"[
                {"field": "status", "name": "Status", "type": "prop"},
                {"field": "tags", "name": "Tags", "type": "array"},
                {"field": "createdAt", "name": "Created", "type": "dateRange"},
                {"field": "archived", "name": "Archived", "type": "boolean"}
            ]"#,
        )
        .unwrap();
        let kinds: Vec<_> = specs.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FilterType::Prop,
                FilterType::Array,
                FilterType::DateRange,
                FilterType::Boolean
            ]
        );
    }

    #[test]
    fn legacy_array_tag_is_accepted() {
        let spec: FilterSpec =
            serde_json::from_str(r#"{"field": "tags", "name": "t", "type": "array'"}"#).unwrap();
        assert_eq!(spec.kind, FilterType::Array);
        assert_eq!(
            serde_json::to_value(&spec).unwrap()["type"],
            serde_json::json!("array")
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = FilterSpecList::from_json(r#"[{"field": "x", "type": "range"}]"#).unwrap_err();
        assert!(matches!(err, FilterError::InvalidSpec { .. }));
    }

    #[test]
    fn others_skips_edited_field() {
        let specs = FilterSpecList::new(vec![
            FilterSpec::new("a", FilterType::Prop),
            FilterSpec::new("b", FilterType::Array).named("B"),
        ]);
        let others: Vec<_> = specs.others("a").map(|s| s.field.as_str()).collect();
        assert_eq!(others, vec!["b"]);
        assert!(FilterType::Array.is_categorical());
        assert!(!FilterType::Search.is_categorical());
    }

    #[test]
    fn facet_wire_shape() {
        let json = serde_json::to_value(FacetCount::new("open", 3)).unwrap();
        assert_eq!(json, serde_json::json!({"name": "open", "count": 3}));
    }
}
