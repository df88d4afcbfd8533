//! Aggregation pipelines for filter values and facets.

use super::selector::{generate_selector, Selector};
use stowage_filter::{Filter, FilterSpecList, FilterType};
use stowage_value::Value;
use tracing::warn;

/// Group accumulator over one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Smallest value of the field.
    Min(String),
    /// Largest value of the field.
    Max(String),
}

/// One aggregation stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep documents matching the selector. `None` keeps everything.
    Match(Option<Selector>),
    /// Collapse all documents into one, computing named accumulators.
    Group(Vec<(String, Accumulator)>),
    /// Emit one document per element of the array at the path.
    Unwind(String),
    /// Count documents per value of the path, most frequent first.
    SortByCount(String),
    /// Run named sub-pipelines over the same input.
    Facet(Vec<(String, Vec<Stage>)>),
}

impl Stage {
    /// Renders the stage as a Mongo pipeline document.
    pub fn to_document(&self) -> Value {
        let (name, body) = match self {
            Stage::Match(selector) => (
                "$match",
                selector
                    .as_ref()
                    .map_or(Value::Map(Vec::new()), Selector::to_document),
            ),
            Stage::Group(accumulators) => {
                let mut fields = vec![(Value::from("_id"), Value::Null)];
                for (name, acc) in accumulators {
                    let (op, path) = match acc {
                        Accumulator::Min(path) => ("$min", path),
                        Accumulator::Max(path) => ("$max", path),
                    };
                    fields.push((
                        Value::from(name.as_str()),
                        Value::Map(vec![(Value::from(op), field_ref(path))]),
                    ));
                }
                ("$group", Value::Map(fields))
            }
            Stage::Unwind(path) => ("$unwind", field_ref(path)),
            Stage::SortByCount(path) => ("$sortByCount", field_ref(path)),
            Stage::Facet(facets) => (
                "$facet",
                Value::Map(
                    facets
                        .iter()
                        .map(|(name, stages)| {
                            (Value::from(name.as_str()), render_pipeline(stages))
                        })
                        .collect(),
                ),
            ),
        };
        Value::Map(vec![(Value::from(name), body)])
    }
}

fn field_ref(path: &str) -> Value {
    Value::Text(format!("${path}"))
}

/// Renders a pipeline as an array of stage documents.
pub fn render_pipeline(stages: &[Stage]) -> Value {
    Value::Array(stages.iter().map(Stage::to_document).collect())
}

/// Pipeline yielding one `{from, to}` document with the extent of a date
/// field: `from` is the earliest value, `to` the latest.
pub fn date_extent_pipeline(field: &str) -> Vec<Stage> {
    vec![Stage::Group(vec![
        ("from".to_string(), Accumulator::Min(field.to_string())),
        ("to".to_string(), Accumulator::Max(field.to_string())),
    ])]
}

/// Pipeline counting values of every categorical spec other than `field`,
/// within the documents selected by `filter`.
///
/// Array specs are unwound first so each element is counted. Other spec
/// kinds have no facet.
pub fn facet_pipeline(field: &str, specs: &FilterSpecList, filter: &Filter) -> Vec<Stage> {
    let mut facets = Vec::new();
    for spec in specs.others(field) {
        match spec.kind {
            FilterType::Prop => {
                facets.push((spec.field.clone(), vec![Stage::SortByCount(spec.field.clone())]));
            }
            FilterType::Array => facets.push((
                spec.field.clone(),
                vec![
                    Stage::Unwind(spec.field.clone()),
                    Stage::SortByCount(spec.field.clone()),
                ],
            )),
            FilterType::DateRange
            | FilterType::Boolean
            | FilterType::Search
            | FilterType::Constant
            | FilterType::Static => {}
        }
    }
    if facets.is_empty() {
        warn!(field, "no categorical filter specs to facet");
    }
    vec![Stage::Match(generate_selector(filter)), Stage::Facet(facets)]
}
