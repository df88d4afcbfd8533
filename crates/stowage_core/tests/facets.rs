//! Candidate values and facet counts on every engine.

use stowage_core::{Crud, DataStorage};
use stowage_filter::{FacetCount, FieldValues, Filter, Matcher};
use stowage_testkit::prelude::*;

fn task_specs() -> FilterSpecList {
    FilterSpecList::new(vec![
        FilterSpec::new("status", FilterType::Prop).named("Status"),
        FilterSpec::new("tags", FilterType::Array).named("Tags"),
        FilterSpec::new("createdAt", FilterType::DateRange).named("Created"),
        FilterSpec::new("done", FilterType::Boolean).named("Done"),
        FilterSpec::new("title", FilterType::Search).named("Title"),
    ])
}

fn texts(values: &[&str]) -> FieldValues {
    FieldValues::Values(values.iter().map(|v| Value::from(*v)).collect())
}

fn facets(entries: &[(&str, u64)]) -> Vec<FacetCount> {
    entries
        .iter()
        .map(|(name, count)| FacetCount::new(*name, *count))
        .collect()
}

fn candidate_values<S: DataStorage>(crud: &Crud<S>) {
    let engine = crud.storage().name();
    let values = crud.filter_values("task", &task_specs()).unwrap();
    assert_eq!(
        values.keys().map(String::as_str).collect::<Vec<_>>(),
        ["createdAt", "status", "tags"],
        "{engine}"
    );
    assert_eq!(values["status"], texts(&["closed", "open", "review"]), "{engine}");
    assert_eq!(
        values["tags"],
        texts(&["bug", "docs", "release", "sql", "store"]),
        "{engine}"
    );
    assert_eq!(
        values["createdAt"],
        FieldValues::Range(DateRange::new(utc(2024, 1, 10, 9, 0), utc(2024, 2, 20, 11, 15))),
        "{engine}"
    );
}

#[test]
fn candidate_values_on_every_engine() {
    candidate_values(&TestCrud::memory().seeded().crud);
    candidate_values(&TestCrud::sqlite().seeded().crud);
}

fn empty_type_has_no_extent<S: DataStorage>(crud: &Crud<S>) {
    let values = crud.filter_values("task", &task_specs()).unwrap();
    assert_eq!(values.get("status"), Some(&texts(&[])), "{}", crud.storage().name());
    assert_eq!(values.get("createdAt"), None, "{}", crud.storage().name());
}

#[test]
fn empty_type_has_no_extent_on_every_engine() {
    empty_type_has_no_extent(&TestCrud::memory().crud);
    empty_type_has_no_extent(&TestCrud::sqlite().crud);
}

fn facet_counts<S: DataStorage>(crud: &Crud<S>) {
    let engine = crud.storage().name();

    let counts = crud
        .filter_values_x("task", "tags", &task_specs(), &Filter::new())
        .unwrap();
    assert_eq!(counts.len(), 1, "{engine}");
    assert_eq!(
        counts["status"],
        facets(&[("closed", 2), ("open", 2), ("review", 1)]),
        "{engine}"
    );

    let counts = crud
        .filter_values_x("task", "status", &task_specs(), &Filter::new())
        .unwrap();
    assert_eq!(
        counts["tags"],
        facets(&[("store", 2), ("bug", 1), ("docs", 1), ("release", 1), ("sql", 1)]),
        "{engine}"
    );

    let open = Filter::new().prop("status", Matcher::one(["open"]));
    let counts = crud
        .filter_values_x("task", "status", &task_specs(), &open)
        .unwrap();
    assert_eq!(
        counts["tags"],
        facets(&[("bug", 1), ("docs", 1), ("store", 1)]),
        "{engine}"
    );
}

#[test]
fn facet_counts_on_every_engine() {
    facet_counts(&TestCrud::memory().seeded().crud);
    facet_counts(&TestCrud::sqlite().seeded().crud);
}

fn nothing_to_facet<S: DataStorage>(crud: &Crud<S>) {
    let specs = FilterSpecList::new(vec![
        FilterSpec::new("status", FilterType::Prop),
        FilterSpec::new("createdAt", FilterType::DateRange),
    ]);
    let counts = crud
        .filter_values_x("task", "status", &specs, &Filter::new())
        .unwrap();
    assert!(counts.is_empty(), "{}", crud.storage().name());
}

#[test]
fn nothing_to_facet_on_every_engine() {
    nothing_to_facet(&TestCrud::memory().seeded().crud);
    nothing_to_facet(&TestCrud::sqlite().seeded().crud);
}

#[test]
fn facet_names_keep_field_types() {
    let crud = TestCrud::sqlite().seeded();
    let specs = FilterSpecList::new(vec![
        FilterSpec::new("status", FilterType::Prop),
        FilterSpec::new("priority", FilterType::Prop),
    ]);
    let counts = crud
        .filter_values_x("task", "status", &specs, &Filter::new().boolean("done", true))
        .unwrap();
    assert_eq!(
        counts["priority"],
        vec![FacetCount::new(1, 1), FacetCount::new(3, 1)]
    );
}
