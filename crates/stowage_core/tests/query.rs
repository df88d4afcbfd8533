//! Filtered, sorted and paged reads on every engine.

use proptest::prelude::*;
use stowage_core::{parse_query, Crud, CrudConfig, DataStorage, DocumentStorage};
use stowage_filter::{CountList, Filter, Matcher, MatchStrategy};
use stowage_store::{InMemoryDocumentStore, PoolConfig};
use stowage_testkit::prelude::*;

fn ids<S: DataStorage>(crud: &Crud<S>, query: &Query) -> Vec<String> {
    ids_of(&crud.retrieve("task", query).unwrap())
}

fn sorted_ids<S: DataStorage>(crud: &Crud<S>, filter: &Filter) -> Vec<String> {
    let mut ids = ids(crud, &Query::new().filter(filter.clone()));
    ids.sort();
    ids
}

fn sorts_and_pages<S: DataStorage>(crud: &Crud<S>) {
    let engine = crud.storage().name();
    assert_eq!(ids(crud, &Query::new()), ["t5", "t4", "t3", "t2", "t1"], "{engine}");
    assert_eq!(
        ids(crud, &Query::new().sort(SortField::ascending("priority"))),
        ["t5", "t1", "t3", "t4", "t2"],
        "{engine}"
    );
    assert_eq!(
        ids(crud, &Query::new().sort(SortField::descending("title"))),
        ["t1", "t5", "t4", "t3", "t2"],
        "{engine}"
    );
    assert_eq!(ids(crud, &Query::new().page(1, 2)), ["t4", "t3"], "{engine}");
    assert!(ids(crud, &Query::new().page(10, 2)).is_empty(), "{engine}");
}

#[test]
fn sorts_and_pages_on_every_engine() {
    sorts_and_pages(&TestCrud::memory().seeded().crud);
    sorts_and_pages(&TestCrud::sqlite().seeded().crud);
}

fn filters_select_expected_tasks<S: DataStorage>(crud: &Crud<S>) {
    let cases: Vec<(Filter, Vec<&str>)> = vec![
        (Filter::new(), vec!["t1", "t2", "t3", "t4", "t5"]),
        (
            Filter::new().prop("status", Matcher::none(["closed"])),
            vec!["t1", "t2", "t4"],
        ),
        (
            Filter::new().prop("status", Matcher::all(["open", "closed"])),
            vec![],
        ),
        (
            Filter::new().prop("priority", Matcher::one([5, 4])),
            vec!["t2", "t4"],
        ),
        (Filter::new().list("tags", Matcher::one(["store"])), vec!["t2", "t4"]),
        (Filter::new().list("tags", Matcher::all(["store", "sql"])), vec!["t4"]),
        (
            Filter::new().list("tags", Matcher::none(["store"])),
            vec!["t1", "t3", "t5"],
        ),
        (Filter::new().boolean("done", true), vec!["t3", "t5"]),
        (
            Filter::new().date("createdAt", DateRange::new(utc(2024, 2, 1, 12, 0), utc(2024, 2, 3, 0, 0))),
            vec!["t3", "t4"],
        ),
        (
            Filter::new()
                .prop("status", Matcher::one(["open"]))
                .list("tags", Matcher::one(["store"])),
            vec!["t2"],
        ),
        (
            Filter::new().prop("status", Matcher::new(MatchStrategy::None, Vec::<Value>::new())),
            vec!["t1", "t2", "t3", "t4", "t5"],
        ),
        (
            Filter::new().search("title", Matcher::one(["docs"])),
            vec!["t1", "t2", "t3", "t4", "t5"],
        ),
    ];
    for (filter, expected) in cases {
        let engine = crud.storage().name();
        assert_eq!(sorted_ids(crud, &filter), expected, "{engine}: {filter:?}");
        assert_eq!(
            crud.count("task", &filter).unwrap(),
            expected.len() as u64,
            "{engine}: {filter:?}"
        );
    }
}

#[test]
fn filters_select_expected_tasks_on_every_engine() {
    filters_select_expected_tasks(&TestCrud::memory().seeded().crud);
    filters_select_expected_tasks(&TestCrud::sqlite().seeded().crud);
}

fn edge_task(id: &str, created_at: chrono::DateTime<chrono::Utc>) -> Task {
    let mut task = sample_tasks().remove(0);
    task.id = id.to_string();
    task.created_at = created_at;
    task
}

fn date_range_ends_with_its_last_day<S: DataStorage>(crud: &Crud<S>) {
    let engine = crud.storage().name();
    let midnight = utc(2024, 3, 5, 0, 0);
    for task in [
        edge_task("last", midnight - chrono::Duration::milliseconds(1)),
        edge_task("next", midnight),
    ] {
        crud.create_item(&task).unwrap();
    }

    let filter = Filter::new().date("createdAt", DateRange::new(utc(2024, 3, 4, 9, 0), utc(2024, 3, 4, 17, 0)));
    assert_eq!(sorted_ids(crud, &filter), ["last"], "{engine}");
    assert_eq!(crud.count("task", &filter).unwrap(), 1, "{engine}");

    let filter = Filter::new().date("createdAt", DateRange::new(midnight, midnight));
    assert_eq!(sorted_ids(crud, &filter), ["next"], "{engine}");
}

#[test]
fn date_range_ends_with_its_last_day_on_every_engine() {
    date_range_ends_with_its_last_day(&TestCrud::memory().crud);
    date_range_ends_with_its_last_day(&TestCrud::sqlite().crud);
}

fn counts_alongside_page<S: DataStorage>(crud: &Crud<S>) {
    let filter = Filter::new().prop("status", Matcher::one(["open", "review"]));
    let CountList { total, data } = crud
        .retrieve_with_count("task", &Query::new().filter(filter).page(0, 2))
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(ids_of(&data), ["t4", "t2"]);
}

#[test]
fn counts_alongside_page_on_every_engine() {
    counts_alongside_page(&TestCrud::memory().seeded().crud);
    counts_alongside_page(&TestCrud::sqlite().seeded().crud);
}

#[test]
fn request_parameters_drive_reads() {
    let crud = TestCrud::sqlite().seeded();
    let query = parse_query(
        Some(r#"{"lists": {"tags": {"strategy": "one", "fields": ["store", "docs"]}}}"#),
        Some("priority"),
        Some("0"),
        Some("2"),
    )
    .unwrap();
    let page = crud.retrieve_with_count("task", &query).unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(ids_of(&page.data), ["t1", "t4"]);

    let query = parse_query(Some(""), None, Some("0"), Some("0")).unwrap();
    assert_eq!(crud.count("task", &query.filter).unwrap(), 5);
}

#[test]
fn page_size_is_capped() {
    let storage = DocumentStorage::new(InMemoryDocumentStore::new(), PoolConfig::default());
    let crud = Crud::new(
        sample_registry(),
        storage,
        CrudConfig::new().max_limit(2).default_sort("priority"),
    );
    for task in sample_tasks() {
        crud.create_item(&task).unwrap();
    }
    assert_eq!(ids(&crud, &Query::new()), ["t5", "t1"]);
    assert_eq!(ids(&crud, &Query::new().page(2, 50)), ["t3", "t4"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn engines_agree_with_direct_evaluation(
        tasks in tasks_strategy(8),
        filter in task_filter_strategy(),
    ) {
        let mut expected: Vec<String> = tasks
            .iter()
            .filter(|t| task_matches(t, &filter))
            .map(|t| t.id.clone())
            .collect();
        expected.sort();

        let memory = TestCrud::memory().with_tasks(&tasks);
        let sqlite = TestCrud::sqlite().with_tasks(&tasks);
        prop_assert_eq!(&sorted_ids(&memory.crud, &filter), &expected);
        prop_assert_eq!(&sorted_ids(&sqlite.crud, &filter), &expected);
        prop_assert_eq!(memory.count("task", &filter).unwrap(), expected.len() as u64);
        prop_assert_eq!(sqlite.count("task", &filter).unwrap(), expected.len() as u64);
    }
}
