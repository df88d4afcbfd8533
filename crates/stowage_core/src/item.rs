//! The record capability trait and body binding.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as Json;
use stowage_value::Value;

/// A record type the dispatcher can store.
///
/// Implementors describe how to build a fresh instance, where its key
/// lives and how to stamp modification metadata. Field names on the wire
/// and in storage are the serde names of the type.
///
/// # Example
///
/// ```rust
/// use chrono::{DateTime, Utc};
/// use serde::{Deserialize, Serialize};
/// use stowage_core::Item;
/// use stowage_value::Value;
///
/// #[derive(Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Note {
///     id: String,
///     text: String,
///     #[serde(with = "stowage_value::timestamp")]
///     created_at: DateTime<Utc>,
///     #[serde(with = "stowage_value::timestamp")]
///     modified_at: DateTime<Utc>,
///     modified_by: String,
/// }
///
/// impl Item for Note {
///     const DATA_TYPE: &'static str = "note";
///     const KEY_FIELD: &'static str = "id";
///
///     fn instantiate(by: &str, at: DateTime<Utc>) -> Self {
///         Note {
///             id: String::new(),
///             text: String::new(),
///             created_at: at,
///             modified_at: at,
///             modified_by: by.to_string(),
///         }
///     }
///
///     fn key(&self) -> Value {
///         Value::from(self.id.as_str())
///     }
///
///     fn set_mod_info(&mut self, at: DateTime<Utc>, by: &str) {
///         self.modified_at = at;
///         self.modified_by = by.to_string();
///     }
/// }
/// ```
pub trait Item: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Registered type name; also the collection or table name.
    const DATA_TYPE: &'static str;

    /// Path of the key field.
    const KEY_FIELD: &'static str;

    /// Creates a zero instance attributed to `by` at `at`.
    fn instantiate(by: &str, at: DateTime<Utc>) -> Self;

    /// Returns the key value.
    fn key(&self) -> Value;

    /// Records a modification by `by` at `at`.
    fn set_mod_info(&mut self, at: DateTime<Utc>, by: &str);

    /// Column paths for relational storage.
    ///
    /// Defaults to the flat projection of a zero instance. Override it when
    /// the zero instance leaves fields out (absent optionals, empty
    /// arrays); array fields are declared as element paths `field.0`,
    /// `field.1`, ...
    fn columns() -> Option<Vec<String>> {
        None
    }
}

/// Deep-merges `patch` into `target`: objects merge key by key, every
/// other value replaces what it lands on.
pub fn merge_json(target: &mut Json, patch: &Json) {
    match (target, patch) {
        (Json::Object(target), Json::Object(patch)) => {
            for (key, value) in patch {
                merge_json(target.entry(key.clone()).or_insert(Json::Null), value);
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Binds a JSON record body onto a zero instance of `T`.
///
/// Fields missing from the body keep their zero values.
///
/// # Errors
///
/// Returns [`CoreError::Binding`] if the body is not an object or does not
/// fit the type.
pub fn bind<T: Item>(body: &Json, by: &str, at: DateTime<Utc>) -> CoreResult<T> {
    if !body.is_object() {
        return Err(CoreError::binding(format!(
            "{} body must be a JSON object",
            T::DATA_TYPE
        )));
    }
    let mut merged = serde_json::to_value(T::instantiate(by, at))?;
    merge_json(&mut merged, body);
    Ok(serde_json::from_value(merged)?)
}

/// Decodes a stored value into `T`, filling fields the value lacks from a
/// zero instance.
///
/// # Errors
///
/// Returns [`CoreError::Binding`] if the value does not fit the type.
pub fn decode<T: Item>(value: &Value) -> CoreResult<T> {
    let body = serde_json::to_value(value)?;
    bind(&body, "", stowage_filter::zero_timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Profile {
        id: String,
        name: String,
        address: Address,
        tags: Vec<String>,
        #[serde(with = "stowage_value::timestamp")]
        created_at: DateTime<Utc>,
        created_by: String,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Address {
        city: String,
        zip: String,
    }

    impl Item for Profile {
        const DATA_TYPE: &'static str = "profile";
        const KEY_FIELD: &'static str = "id";

        fn instantiate(by: &str, at: DateTime<Utc>) -> Self {
            Profile {
                id: String::new(),
                name: String::new(),
                address: Address {
                    city: "Nowhere".into(),
                    zip: String::new(),
                },
                tags: Vec::new(),
                created_at: at,
                created_by: by.to_string(),
            }
        }

        fn key(&self) -> Value {
            Value::from(self.id.as_str())
        }

        fn set_mod_info(&mut self, _at: DateTime<Utc>, _by: &str) {}
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn body_merges_onto_zero_instance() {
        let body = json!({"id": "p1", "address": {"zip": "560001"}, "tags": ["a"]});
        let profile: Profile = bind(&body, "ann", now()).unwrap();
        assert_eq!(profile.id, "p1");
        assert_eq!(profile.address.city, "Nowhere");
        assert_eq!(profile.address.zip, "560001");
        assert_eq!(profile.tags, vec!["a".to_string()]);
        assert_eq!(profile.created_by, "ann");
        assert_eq!(profile.created_at, now());
    }

    #[test]
    fn malformed_bodies_are_binding_errors() {
        let err = bind::<Profile>(&json!([1, 2]), "ann", now()).unwrap_err();
        assert!(matches!(err, CoreError::Binding { .. }));
        let err = bind::<Profile>(&json!({"tags": "not a list"}), "ann", now()).unwrap_err();
        assert!(matches!(err, CoreError::Binding { .. }));
    }

    #[test]
    fn decode_fills_missing_fields() {
        let stored = Value::Map(vec![
            (Value::from("id"), Value::from("p1")),
            (Value::from("createdAt"), Value::Timestamp(now())),
        ]);
        let profile: Profile = decode(&stored).unwrap();
        assert_eq!(profile.id, "p1");
        assert_eq!(profile.created_at, now());
        assert!(profile.tags.is_empty());
    }

    #[test]
    fn merge_replaces_non_objects() {
        let mut target = json!({"a": {"b": 1, "c": 2}, "d": [1, 2]});
        merge_json(&mut target, &json!({"a": {"c": 3}, "d": [9]}));
        assert_eq!(target, json!({"a": {"b": 1, "c": 3}, "d": [9]}));
    }
}
