//! Filter compilation for document stores.
//!
//! [`generate_selector`] turns a [`Filter`] into a conjunctive
//! [`Selector`]. [`Selector::to_document`] renders it in the Mongo query
//! language:
//!
//! | Filter entry | Selector |
//! |---|---|
//! | prop/list, strategy `one` | `{f: {"$in": [..]}}` |
//! | prop/list, strategy `all` | `{f: {"$all": [..]}}` |
//! | prop/list, strategy `none` | `{f: {"$nin": [..]}}` |
//! | bool | `{f: v}` |
//! | date range | `{f: {"$gte": start of day, "$lte": end of day}}` |

use stowage_filter::{Filter, MatchStrategy, Matcher, SortField};
use stowage_value::Value;

/// Constraint on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value (or, for arrays, contains it).
    Eq(Value),
    /// Field matches at least one value.
    In(Vec<Value>),
    /// Field contains every value.
    All(Vec<Value>),
    /// Field matches none of the values.
    Nin(Vec<Value>),
    /// Field lies in the inclusive range.
    Range {
        /// Lower bound.
        gte: Value,
        /// Upper bound.
        lte: Value,
    },
}

/// A compiled document query.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// All sub-selectors match.
    And(Vec<Selector>),
    /// A single field constraint.
    Field {
        /// Dotted field path.
        path: String,
        /// Constraint.
        condition: Condition,
    },
}

impl Selector {
    /// Selects documents whose `path` equals `value`.
    pub fn eq(path: impl Into<String>, value: Value) -> Self {
        Selector::Field {
            path: path.into(),
            condition: Condition::Eq(value),
        }
    }

    /// Renders the selector as a Mongo query document.
    pub fn to_document(&self) -> Value {
        match self {
            Selector::And(parts) => Value::Map(vec![(
                Value::from("$and"),
                Value::Array(parts.iter().map(Selector::to_document).collect()),
            )]),
            Selector::Field { path, condition } => {
                let rendered = match condition {
                    Condition::Eq(value) => value.clone(),
                    Condition::In(values) => operator("$in", Value::Array(values.clone())),
                    Condition::All(values) => operator("$all", Value::Array(values.clone())),
                    Condition::Nin(values) => operator("$nin", Value::Array(values.clone())),
                    Condition::Range { gte, lte } => Value::Map(vec![
                        (Value::from("$gte"), gte.clone()),
                        (Value::from("$lte"), lte.clone()),
                    ]),
                };
                Value::Map(vec![(Value::from(path.as_str()), rendered)])
            }
        }
    }
}

fn operator(name: &str, operand: Value) -> Value {
    Value::Map(vec![(Value::from(name), operand)])
}

fn matcher_condition(matcher: &Matcher) -> Condition {
    let values = matcher.fields.clone();
    match matcher.strategy {
        MatchStrategy::One => Condition::In(values),
        MatchStrategy::All => Condition::All(values),
        MatchStrategy::None => Condition::Nin(values),
    }
}

/// Compiles `filter` into a selector.
///
/// Clauses come from props, bools, dates and lists, in that order and by
/// field name within each group. Empty matchers, null booleans and invalid
/// date ranges contribute nothing. Searches are not compiled. Returns
/// `None` when no clause remains, meaning "match everything".
pub fn generate_selector(filter: &Filter) -> Option<Selector> {
    let mut clauses = Vec::new();
    for (path, matcher) in &filter.props {
        if !matcher.is_empty() {
            clauses.push(Selector::Field {
                path: path.clone(),
                condition: matcher_condition(matcher),
            });
        }
    }
    for (path, value) in &filter.bools {
        if !value.is_null() {
            clauses.push(Selector::eq(path.clone(), value.clone()));
        }
    }
    for (path, range) in &filter.dates {
        if let Some((from, to)) = range.bounds() {
            clauses.push(Selector::Field {
                path: path.clone(),
                condition: Condition::Range {
                    gte: Value::Timestamp(from),
                    lte: Value::Timestamp(to),
                },
            });
        }
    }
    for (path, matcher) in &filter.lists {
        if !matcher.is_empty() {
            clauses.push(Selector::Field {
                path: path.clone(),
                condition: matcher_condition(matcher),
            });
        }
    }
    if clauses.is_empty() {
        None
    } else {
        Some(Selector::And(clauses))
    }
}

/// Renders a sort specification: `{field: 1}` or `{field: -1}`.
pub fn sort_document(sort: &SortField) -> Value {
    Value::Map(vec![(
        Value::from(sort.field.as_str()),
        Value::Integer(i64::from(sort.direction.as_i32())),
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use stowage_filter::DateRange;

    #[test]
    fn empty_filter_selects_everything() {
        assert_eq!(generate_selector(&Filter::default()), None);
        let inert = Filter::new()
            .prop("status", Matcher::one(Vec::<Value>::new()))
            .boolean("archived", Value::Null)
            .date("createdAt", DateRange::default());
        assert_eq!(generate_selector(&inert), None);
    }

    #[test]
    fn strategies_pick_operators() {
        let filter = Filter::new()
            .prop("a", Matcher::one(["x"]))
            .prop("b", Matcher::all(["y"]))
            .prop("c", Matcher::none(["z"]));
        let doc = generate_selector(&filter).unwrap().to_document();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"$and": [
                {"a": {"$in": ["x"]}},
                {"b": {"$all": ["y"]}},
                {"c": {"$nin": ["z"]}},
            ]})
        );
    }

    #[test]
    fn bools_dates_and_lists() {
        let from = Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap();
        let filter = Filter::new()
            .boolean("archived", false)
            .date("createdAt", DateRange::new(from, to))
            .list("tags", Matcher::all(["a", "b"]));
        let selector = generate_selector(&filter).unwrap();
        let Selector::And(clauses) = selector else {
            panic!("expected conjunction");
        };
        assert_eq!(clauses.len(), 3);
        assert_eq!(clauses[0], Selector::eq("archived", Value::Bool(false)));
        assert_eq!(
            clauses[1],
            Selector::Field {
                path: "createdAt".into(),
                condition: Condition::Range {
                    gte: Value::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
                    lte: Value::Timestamp(stowage_filter::end_of_day(to)),
                },
            }
        );
        assert_eq!(
            clauses[2],
            Selector::Field {
                path: "tags".into(),
                condition: Condition::All(vec![Value::from("a"), Value::from("b")]),
            }
        );
    }

    #[test]
    fn sort_rendering() {
        let doc = sort_document(&SortField::parse("-createdAt").unwrap());
        assert_eq!(
            doc,
            Value::Map(vec![(Value::from("createdAt"), Value::Integer(-1))])
        );
    }
}
