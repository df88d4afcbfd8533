//! Type registry: record handlers keyed by type name.
//!
//! Handlers are registered on a [`RegistryBuilder`] during startup and
//! sealed into an immutable [`TypeRegistry`]. The sealed registry has no
//! mutation API, so it can be shared freely across threads.

use crate::error::{CoreError, CoreResult};
use crate::item::{bind, Item};
use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use stowage_filter::zero_timestamp;
use stowage_store::Table;
use stowage_value::{to_value, FlatMap, Value};
use tracing::{debug, info};

/// Type-erased operations on one registered record type.
pub trait ItemHandler: Send + Sync {
    /// Registered type name.
    fn data_type(&self) -> &'static str;

    /// Path of the key field.
    fn key_field(&self) -> &'static str;

    /// Binds a body for creation onto a zero instance attributed to `by`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Binding`] if the body does not fit the type.
    fn bind_new(&self, body: &Json, by: &str, at: DateTime<Utc>) -> CoreResult<Value>;

    /// Binds a body for update, stamps modification metadata and returns
    /// `(key, record)`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Binding`] if the body does not fit the type or
    /// carries no key.
    fn bind_update(&self, body: &Json, by: &str, at: DateTime<Utc>) -> CoreResult<(Value, Value)>;

    /// Relational layout of the type.
    fn table(&self) -> &Table;

    /// Flat projection of a zero instance, used for column types and
    /// read-back coercion.
    fn template(&self) -> &FlatMap;
}

/// [`ItemHandler`] for a statically known [`Item`] type.
pub struct TypedHandler<T> {
    table: Table,
    template: FlatMap,
    _item: PhantomData<fn() -> T>,
}

impl<T: Item> TypedHandler<T> {
    /// Builds the handler, deriving the table layout from
    /// [`Item::columns`] or from a zero instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the zero instance cannot be projected or a
    /// column name is unusable.
    pub fn new() -> CoreResult<Self> {
        let template = FlatMap::from_item(&T::instantiate("", zero_timestamp()))?;
        let columns = T::columns()
            .unwrap_or_else(|| template.paths().map(str::to_string).collect());
        let table = Table::new(T::DATA_TYPE, T::KEY_FIELD, columns)?;
        Ok(Self {
            table,
            template,
            _item: PhantomData,
        })
    }
}

impl<T: Item> ItemHandler for TypedHandler<T> {
    fn data_type(&self) -> &'static str {
        T::DATA_TYPE
    }

    fn key_field(&self) -> &'static str {
        T::KEY_FIELD
    }

    fn bind_new(&self, body: &Json, by: &str, at: DateTime<Utc>) -> CoreResult<Value> {
        let item: T = bind(body, by, at)?;
        Ok(to_value(&item)?)
    }

    fn bind_update(&self, body: &Json, by: &str, at: DateTime<Utc>) -> CoreResult<(Value, Value)> {
        let mut item: T = bind(body, by, at)?;
        item.set_mod_info(at, by);
        let key = item.key();
        if key.is_null() || key.as_text().is_some_and(str::is_empty) {
            return Err(CoreError::binding(format!(
                "{} update carries no '{}'",
                T::DATA_TYPE,
                T::KEY_FIELD
            )));
        }
        Ok((key, to_value(&item)?))
    }

    fn table(&self) -> &Table {
        &self.table
    }

    fn template(&self) -> &FlatMap {
        &self.template
    }
}

/// Collects handlers before the registry is sealed.
#[derive(Default)]
pub struct RegistryBuilder {
    handlers: BTreeMap<&'static str, Arc<dyn ItemHandler>>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under [`Item::DATA_TYPE`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateType`] if the name is taken, or an
    /// error if the handler cannot be built.
    pub fn register<T: Item>(self) -> CoreResult<Self> {
        self.register_handler(Arc::new(TypedHandler::<T>::new()?))
    }

    /// Registers a custom handler under its type name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateType`] if the name is taken.
    pub fn register_handler(mut self, handler: Arc<dyn ItemHandler>) -> CoreResult<Self> {
        let data_type = handler.data_type();
        if self.handlers.contains_key(data_type) {
            return Err(CoreError::DuplicateType {
                data_type: data_type.to_string(),
            });
        }
        debug!(data_type, columns = handler.table().columns().len(), "registered item handler");
        self.handlers.insert(data_type, handler);
        Ok(self)
    }

    /// Freezes the registry.
    pub fn seal(self) -> Arc<TypeRegistry> {
        info!(types = self.handlers.len(), "type registry sealed");
        Arc::new(TypeRegistry {
            handlers: self.handlers,
        })
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("types", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Immutable map from type name to handler.
pub struct TypeRegistry {
    handlers: BTreeMap<&'static str, Arc<dyn ItemHandler>>,
}

impl TypeRegistry {
    /// Returns the handler for `data_type`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] if nothing is registered under
    /// the name.
    pub fn get(&self, data_type: &str) -> CoreResult<&dyn ItemHandler> {
        self.handlers
            .get(data_type)
            .map(|h| h.as_ref())
            .ok_or_else(|| CoreError::unknown_type(data_type))
    }

    /// Returns true if `data_type` is registered.
    pub fn contains(&self, data_type: &str) -> bool {
        self.handlers.contains_key(data_type)
    }

    /// Returns the registered type names in order.
    pub fn data_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Returns all handlers, ordered by type name.
    pub fn handlers(&self) -> impl Iterator<Item = &dyn ItemHandler> + '_ {
        self.handlers.values().map(|h| h.as_ref())
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Tag {
        label: String,
        uses: i64,
        #[serde(with = "stowage_value::timestamp")]
        modified_at: DateTime<Utc>,
        modified_by: String,
    }

    impl Item for Tag {
        const DATA_TYPE: &'static str = "tag";
        const KEY_FIELD: &'static str = "label";

        fn instantiate(by: &str, at: DateTime<Utc>) -> Self {
            Tag {
                label: String::new(),
                uses: 0,
                modified_at: at,
                modified_by: by.to_string(),
            }
        }

        fn key(&self) -> Value {
            Value::from(self.label.as_str())
        }

        fn set_mod_info(&mut self, at: DateTime<Utc>, by: &str) {
            self.modified_at = at;
            self.modified_by = by.to_string();
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn sealed_registry_resolves_handlers() {
        let registry = RegistryBuilder::new().register::<Tag>().unwrap().seal();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("tag"));
        assert_eq!(registry.data_types().collect::<Vec<_>>(), vec!["tag"]);

        let handler = registry.get("tag").unwrap();
        assert_eq!(handler.key_field(), "label");
        assert_eq!(
            handler.table().columns(),
            ["label", "modifiedAt", "modifiedBy", "uses"].map(String::from)
        );

        let err = registry.get("nope").err().unwrap();
        assert!(matches!(err, CoreError::UnknownType { .. }));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let err = RegistryBuilder::new()
            .register::<Tag>()
            .unwrap()
            .register::<Tag>()
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateType { .. }));
    }

    #[test]
    fn update_binding_stamps_and_requires_key() {
        let handler = TypedHandler::<Tag>::new().unwrap();
        let (key, record) = handler
            .bind_update(&json!({"label": "rust", "uses": 3}), "bob", now())
            .unwrap();
        assert_eq!(key, Value::from("rust"));
        assert_eq!(record.get("modifiedBy"), Some(&Value::from("bob")));
        assert_eq!(record.get("uses"), Some(&Value::Integer(3)));

        let err = handler.bind_update(&json!({"uses": 3}), "bob", now()).unwrap_err();
        assert!(matches!(err, CoreError::Binding { .. }));
    }
}
