//! Rebuilding nested values from result rows.

use stowage_value::timestamp::parse_timestamp;
use stowage_value::{FlatMap, Record, Value};

/// Converts a column value back to the kind of `template`.
///
/// Engines without native booleans or timestamps hand back integers and
/// text; the template projection of the record type tells which columns
/// held what.
pub fn coerce(value: Value, template: Option<&Value>) -> Value {
    match (template, value) {
        (Some(Value::Bool(_)), Value::Integer(n)) => Value::Bool(n != 0),
        (Some(Value::Float(_)), Value::Integer(n)) => {
            #[allow(clippy::cast_precision_loss)]
            let widened = n as f64;
            Value::Float(widened)
        }
        (Some(Value::Timestamp(_)), Value::Text(text)) => match parse_timestamp(&text) {
            Ok(at) => Value::Timestamp(at),
            Err(_) => Value::Text(text),
        },
        (_, value) => value,
    }
}

/// Rebuilds a nested value from a row labelled with projection paths.
///
/// `NULL` columns fall back to the template value of their path, or are
/// left out when the template has none.
pub fn rehydrate(row: Record, template: &FlatMap) -> Value {
    let mut flat = FlatMap::new();
    for (field, value) in row.into_fields() {
        let expected = template.get(field.name());
        let value = if value.is_null() {
            match expected {
                Some(fallback) => fallback.clone(),
                None => continue,
            }
        } else {
            coerce(value, expected)
        };
        flat.insert(field.name(), value);
    }
    flat.unflatten()
}
