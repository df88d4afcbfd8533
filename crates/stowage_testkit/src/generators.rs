//! Property-based test generators using proptest.
//!
//! Provides strategies for tasks and for filters over the task fields.
//! Generated tasks stay within what every engine stores faithfully: at
//! most [`MAX_TASK_TAGS`] tags and whole-second timestamps.

use crate::fixtures::{Task, MAX_TASK_TAGS};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use stowage_filter::{DateRange, Filter, MatchStrategy, Matcher};
use stowage_value::Value;

/// Status values used by generated tasks.
pub const STATUSES: &[&str] = &["open", "review", "closed"];

/// Tag values used by generated tasks.
pub const TAGS: &[&str] = &["bug", "docs", "release", "sql", "store"];

/// Days covered by generated timestamps, starting 2024-01-01.
pub const DAYS: i64 = 60;

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid epoch")
}

/// Strategy for generating status values.
pub fn status_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(STATUSES).prop_map(|s| s.to_string())
}

/// Strategy for generating tag values.
pub fn tag_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(TAGS).prop_map(|s| s.to_string())
}

/// Strategy for generating whole-second timestamps within [`DAYS`].
pub fn timestamp_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0..DAYS * 86_400).prop_map(|secs| epoch() + Duration::seconds(secs))
}

/// Strategy for generating a task with the given key.
pub fn task_strategy(id: String) -> impl Strategy<Value = Task> {
    (
        "[A-Za-z ]{0,16}",
        status_strategy(),
        0i64..6,
        prop::collection::vec(tag_strategy(), 0..=MAX_TASK_TAGS),
        timestamp_strategy(),
    )
        .prop_map(move |(title, status, priority, tags, created_at)| Task {
            id: id.clone(),
            title,
            done: status == "closed",
            status,
            priority,
            tags,
            created_at,
            created_by: "gen".to_string(),
            modified_at: created_at,
            modified_by: "gen".to_string(),
        })
}

/// Strategy for generating up to `max` tasks with distinct keys.
pub fn tasks_strategy(max: usize) -> impl Strategy<Value = Vec<Task>> {
    (0..=max).prop_flat_map(|n| {
        (0..n)
            .map(|i| task_strategy(format!("g{i}")))
            .collect::<Vec<_>>()
    })
}

/// Strategy for generating match strategies.
pub fn match_strategy_strategy() -> impl Strategy<Value = MatchStrategy> {
    prop_oneof![
        Just(MatchStrategy::One),
        Just(MatchStrategy::All),
        Just(MatchStrategy::None),
    ]
}

/// Strategy for generating matchers over `values`.
pub fn matcher_strategy<V>(values: V) -> impl Strategy<Value = Matcher>
where
    V: Strategy<Value = Value>,
{
    (match_strategy_strategy(), prop::collection::vec(values, 0..3))
        .prop_map(|(strategy, fields)| Matcher { strategy, fields })
}

/// Strategy for generating day ranges within [`DAYS`], possibly reversed.
pub fn date_range_strategy() -> impl Strategy<Value = DateRange> {
    (0..DAYS, 0..DAYS).prop_map(|(from, to)| {
        DateRange::new(epoch() + Duration::days(from), epoch() + Duration::days(to))
    })
}

/// Strategy for generating filters over task fields.
pub fn task_filter_strategy() -> impl Strategy<Value = Filter> {
    (
        prop::option::of(matcher_strategy(status_strategy().prop_map(Value::from))),
        prop::option::of(matcher_strategy((0i64..6).prop_map(Value::from))),
        prop::option::of(any::<bool>()),
        prop::option::of(date_range_strategy()),
        prop::option::of(matcher_strategy(tag_strategy().prop_map(Value::from))),
    )
        .prop_map(|(status, priority, done, created, tags)| {
            let mut filter = Filter::new();
            if let Some(matcher) = status {
                filter = filter.prop("status", matcher);
            }
            if let Some(matcher) = priority {
                filter = filter.prop("priority", matcher);
            }
            if let Some(done) = done {
                filter = filter.boolean("done", done);
            }
            if let Some(range) = created {
                filter = filter.date("createdAt", range);
            }
            if let Some(matcher) = tags {
                filter = filter.list("tags", matcher);
            }
            filter
        })
}

/// Evaluates `filter` against `task` directly, as the engines should.
pub fn task_matches(task: &Task, filter: &Filter) -> bool {
    let scalar = |value: Value, matcher: &Matcher| elements_match(&[value], matcher);
    for (field, matcher) in &filter.props {
        let value = match field.as_str() {
            "status" => Value::from(task.status.as_str()),
            "priority" => Value::Integer(task.priority),
            _ => Value::Null,
        };
        if !matcher.is_empty() && !scalar(value, matcher) {
            return false;
        }
    }
    for (field, wanted) in &filter.bools {
        if field == "done" && !wanted.is_null() && wanted.as_bool() != Some(task.done) {
            return false;
        }
    }
    for (field, range) in &filter.dates {
        if let (true, Some((from, to))) = (field == "createdAt", range.bounds()) {
            if task.created_at < from || task.created_at > to {
                return false;
            }
        }
    }
    for (field, matcher) in &filter.lists {
        if field == "tags" && !matcher.is_empty() {
            let tags: Vec<Value> = task.tags.iter().map(|t| Value::from(t.as_str())).collect();
            if !elements_match(&tags, matcher) {
                return false;
            }
        }
    }
    true
}

fn elements_match(elements: &[Value], matcher: &Matcher) -> bool {
    let hit = |wanted: &Value| elements.iter().any(|e| e == wanted);
    match matcher.strategy {
        MatchStrategy::One => matcher.fields.iter().any(hit),
        MatchStrategy::All => matcher.fields.iter().all(hit),
        MatchStrategy::None => !matcher.fields.iter().any(hit),
    }
}
