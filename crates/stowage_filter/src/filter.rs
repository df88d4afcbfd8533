//! The filter model.
//!
//! A [`Filter`] is a conjunction of per-field constraints, grouped by kind.
//! Its JSON shape is what callers send:
//!
//! ```json
//! {
//!   "props":    {"status": {"strategy": "one", "fields": ["open", "hold"]}},
//!   "bools":    {"archived": false},
//!   "dates":    {"createdAt": {"from": "2024-01-01T00:00:00Z", "to": "2024-01-31T00:00:00Z"}},
//!   "lists":    {"tags": {"strategy": "all", "fields": ["a", "b"]}},
//!   "searches": {}
//! }
//! ```
//!
//! Every group is optional; an empty filter matches everything.

use crate::error::{FilterError, FilterResult};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use stowage_value::{timestamp, Value};

/// How the candidate values of a [`Matcher`] combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// The field matches every candidate.
    All,
    /// The field matches at least one candidate.
    #[default]
    One,
    /// The field matches none of the candidates.
    None,
}

/// Candidate values for one field plus the strategy combining them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Matcher {
    /// Combination strategy.
    pub strategy: MatchStrategy,
    /// Candidate values.
    #[serde(deserialize_with = "null_as_default")]
    pub fields: Vec<Value>,
}

impl Matcher {
    /// Creates a matcher.
    pub fn new<V: Into<Value>>(strategy: MatchStrategy, fields: impl IntoIterator<Item = V>) -> Self {
        Self {
            strategy,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Matches every candidate.
    pub fn all<V: Into<Value>>(fields: impl IntoIterator<Item = V>) -> Self {
        Self::new(MatchStrategy::All, fields)
    }

    /// Matches at least one candidate.
    pub fn one<V: Into<Value>>(fields: impl IntoIterator<Item = V>) -> Self {
        Self::new(MatchStrategy::One, fields)
    }

    /// Matches none of the candidates.
    pub fn none<V: Into<Value>>(fields: impl IntoIterator<Item = V>) -> Self {
        Self::new(MatchStrategy::None, fields)
    }

    /// Returns true if there are no candidates. Such matchers are ignored.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Inclusive, day-aligned date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    /// First day of the range.
    #[serde(with = "timestamp::option")]
    pub from: Option<DateTime<Utc>>,
    /// Last day of the range.
    #[serde(with = "timestamp::option")]
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Creates a range between two instants.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// Returns true if both ends are present and neither is the zero
    /// timestamp.
    pub fn is_valid(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if !is_zero(&from) && !is_zero(&to))
    }

    /// Returns the inclusive bounds: start of `from`'s day and end of
    /// `to`'s day. `None` for invalid ranges.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if !self.is_valid() {
            return None;
        }
        Some((start_of_day(self.from?), end_of_day(self.to?)))
    }
}

/// The zero timestamp, `0001-01-01T00:00:00Z`.
pub fn zero_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn is_zero(at: &DateTime<Utc>) -> bool {
    *at == zero_timestamp()
}

/// Midnight (UTC) of the day containing `at`.
pub fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Last representable instant (UTC) of the day containing `at`.
pub fn end_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
        .map_or(at, |time| at.date_naive().and_time(time).and_utc())
}

/// A conjunction of per-field constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    /// Categorical matchers on scalar fields.
    #[serde(deserialize_with = "null_as_default")]
    pub props: BTreeMap<String, Matcher>,
    /// Exact boolean equality. Null values are skipped.
    #[serde(deserialize_with = "null_as_default")]
    pub bools: BTreeMap<String, Value>,
    /// Inclusive day-aligned ranges.
    #[serde(deserialize_with = "null_as_default")]
    pub dates: BTreeMap<String, DateRange>,
    /// Membership matchers on array fields.
    #[serde(deserialize_with = "null_as_default")]
    pub lists: BTreeMap<String, Matcher>,
    /// Free-text search terms. Carried but not compiled.
    #[serde(deserialize_with = "null_as_default")]
    pub searches: BTreeMap<String, Matcher>,
}

impl Filter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a filter from JSON. Empty input yields an empty filter.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidFilter`] if the JSON is malformed.
    pub fn from_json(json: &str) -> FilterResult<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| FilterError::invalid_filter(e.to_string()))
    }

    /// Adds a categorical matcher.
    #[must_use]
    pub fn prop(mut self, field: impl Into<String>, matcher: Matcher) -> Self {
        self.props.insert(field.into(), matcher);
        self
    }

    /// Adds a boolean equality.
    #[must_use]
    pub fn boolean(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bools.insert(field.into(), value.into());
        self
    }

    /// Adds a date range.
    #[must_use]
    pub fn date(mut self, field: impl Into<String>, range: DateRange) -> Self {
        self.dates.insert(field.into(), range);
        self
    }

    /// Adds a membership matcher.
    #[must_use]
    pub fn list(mut self, field: impl Into<String>, matcher: Matcher) -> Self {
        self.lists.insert(field.into(), matcher);
        self
    }

    /// Adds a search matcher.
    #[must_use]
    pub fn search(mut self, field: impl Into<String>, matcher: Matcher) -> Self {
        self.searches.insert(field.into(), matcher);
        self
    }

    /// Returns true if the filter imposes no restriction: no non-empty
    /// matcher, no non-null boolean and no valid date range.
    pub fn is_unrestricted(&self) -> bool {
        self.props.values().all(Matcher::is_empty)
            && self.lists.values().all(Matcher::is_empty)
            && self.bools.values().all(Value::is_null)
            && !self.dates.values().any(DateRange::is_valid)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
    }

    #[test]
    fn decodes_wire_shape() {
        let filter = Filter::from_json(
            r#"{
                "props": {"status": {"strategy": "none", "fields": ["closed"]}},
                "bools": {"archived": false, "pinned": null},
                "dates": {"createdAt": {"from": "2024-01-01T00:00:00Z", "to": "2024-01-31T00:00:00Z"}},
                "lists": {"tags": {"fields": ["a", "b"]}},
                "searches": null
            }"#,
        )
        .unwrap();
        assert_eq!(filter.props["status"], Matcher::none(["closed"]));
        assert_eq!(filter.bools["archived"], Value::Bool(false));
        assert_eq!(filter.bools["pinned"], Value::Null);
        assert!(filter.dates["createdAt"].is_valid());
        assert_eq!(filter.lists["tags"].strategy, MatchStrategy::One);
        assert!(filter.searches.is_empty());
    }

    #[test]
    fn empty_input_is_empty_filter() {
        assert_eq!(Filter::from_json("").unwrap(), Filter::default());
        assert_eq!(Filter::from_json("{}").unwrap(), Filter::default());
        assert!(Filter::default().is_unrestricted());
    }

    #[test]
    fn malformed_input_is_rejected() {
        let err = Filter::from_json(r#"{"props": 3}"#).unwrap_err();
        assert!(matches!(err, FilterError::InvalidFilter { .. }));
    }

    #[test]
    fn unrestricted_ignores_inert_entries() {
        let filter = Filter::new()
            .prop("status", Matcher::one(Vec::<Value>::new()))
            .boolean("archived", Value::Null)
            .date("createdAt", DateRange::default());
        assert!(filter.is_unrestricted());
        assert!(!filter.boolean("pinned", true).is_unrestricted());
    }

    #[test]
    fn date_range_validity() {
        assert!(!DateRange::default().is_valid());
        assert!(!DateRange {
            from: Some(at(2024, 1, 1, 0)),
            to: None
        }
        .is_valid());
        assert!(!DateRange::new(zero_timestamp(), at(2024, 1, 1, 0)).is_valid());
        assert!(DateRange::new(at(2024, 1, 1, 0), at(2024, 1, 2, 0)).is_valid());
    }

    #[test]
    fn zero_time_from_json_is_invalid() {
        let range: DateRange = serde_json::from_str(
            r#"{"from": "0001-01-01T00:00:00Z", "to": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(!range.is_valid());
    }

    #[test]
    fn bounds_snap_to_whole_days() {
        let range = DateRange::new(at(2024, 3, 1, 15), at(2024, 3, 3, 2));
        let (from, to) = range.bounds().unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(
            to,
            Utc.with_ymd_and_hms(2024, 3, 3, 23, 59, 59).unwrap()
                + chrono::Duration::nanoseconds(999_999_999)
        );
        assert_eq!(DateRange::default().bounds(), None);
    }

    #[test]
    fn strategy_wire_names() {
        assert_eq!(
            serde_json::to_string(&MatchStrategy::All).unwrap(),
            "\"all\""
        );
        let s: MatchStrategy = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(s, MatchStrategy::None);
    }
}
