//! Conversion from a [`Value`] back into any `Deserialize` type.

use crate::error::{ValueError, ValueResult};
use crate::value::Value;
use chrono::SecondsFormat;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use std::vec;

/// Converts a [`Value`] into a deserializable type.
///
/// Records and maps deserialize as structs or maps, arrays as sequences.
/// Integers `0`/`1` are accepted where a boolean is expected, which is how
/// relational engines without a boolean type hand them back.
///
/// # Errors
///
/// Returns an error if the value does not match the shape of `T`.
pub fn from_value<T: DeserializeOwned>(value: Value) -> ValueResult<T> {
    T::deserialize(value)
}

impl<'de> IntoDeserializer<'de, ValueError> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> ValueResult<V::Value> {
        match self {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Integer(n) => visitor.visit_i64(n),
            Value::Float(x) => visitor.visit_f64(x),
            Value::Text(s) => visitor.visit_string(s),
            Value::Bytes(b) => visitor.visit_byte_buf(b),
            Value::Timestamp(at) => {
                visitor.visit_string(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Array(items) => visit_array(items, visitor),
            Value::Map(pairs) => visit_pairs(pairs, visitor),
            Value::Record(record) => visit_pairs(
                record
                    .into_fields()
                    .into_iter()
                    .map(|(field, v)| (Value::Text(field.name().to_string()), v))
                    .collect(),
                visitor,
            ),
            Value::Variant(name, inner) => visit_pairs(vec![(Value::Text(name), *inner)], visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> ValueResult<V::Value> {
        match self {
            Value::Integer(0) => visitor.visit_bool(false),
            Value::Integer(1) => visitor.visit_bool(true),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> ValueResult<V::Value> {
        match self {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> ValueResult<V::Value> {
        match self {
            Value::Null => visitor.visit_unit(),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> ValueResult<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> ValueResult<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> ValueResult<V::Value> {
        let (variant, payload) = match self {
            Value::Text(variant) => (variant, None),
            Value::Variant(variant, inner) => (variant, Some(*inner)),
            Value::Map(pairs) if pairs.len() == 1 => {
                let mut pairs = pairs.into_iter();
                match pairs.next() {
                    Some((Value::Text(variant), inner)) => (variant, Some(inner)),
                    _ => return Err(ValueError::deserialization(format!("invalid {name} tag"))),
                }
            }
            other => {
                return Err(ValueError::deserialization(format!(
                    "expected enum {name}, found {other}"
                )))
            }
        };
        visitor.visit_enum(EnumDeserializer { variant, payload })
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> ValueResult<V::Value> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf seq tuple tuple_struct map struct identifier
    }
}

fn visit_array<'de, V: Visitor<'de>>(items: Vec<Value>, visitor: V) -> ValueResult<V::Value> {
    let len = items.len();
    let mut seq = SeqDeserializer {
        iter: items.into_iter(),
    };
    let out = visitor.visit_seq(&mut seq)?;
    if seq.iter.len() == 0 {
        Ok(out)
    } else {
        Err(de::Error::invalid_length(len, &"fewer elements in array"))
    }
}

fn visit_pairs<'de, V: Visitor<'de>>(
    pairs: Vec<(Value, Value)>,
    visitor: V,
) -> ValueResult<V::Value> {
    visitor.visit_map(MapDeserializer {
        iter: pairs.into_iter(),
        pending: None,
    })
}

struct SeqDeserializer {
    iter: vec::IntoIter<Value>,
}

impl<'de> SeqAccess<'de> for SeqDeserializer {
    type Error = ValueError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> ValueResult<Option<T::Value>> {
        self.iter
            .next()
            .map(|value| seed.deserialize(value))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer {
    iter: vec::IntoIter<(Value, Value)>,
    pending: Option<Value>,
}

impl<'de> MapAccess<'de> for MapDeserializer {
    type Error = ValueError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> ValueResult<Option<K::Value>> {
        match self.iter.next() {
            Some((key, value)) => {
                self.pending = Some(value);
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> ValueResult<V::Value> {
        let value = self
            .pending
            .take()
            .ok_or_else(|| ValueError::deserialization("map value requested before key"))?;
        seed.deserialize(value)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct EnumDeserializer {
    variant: String,
    payload: Option<Value>,
}

impl<'de> EnumAccess<'de> for EnumDeserializer {
    type Error = ValueError;
    type Variant = VariantDeserializer;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> ValueResult<(V::Value, VariantDeserializer)> {
        let tag = seed.deserialize(Value::Text(self.variant))?;
        Ok((
            tag,
            VariantDeserializer {
                payload: self.payload,
            },
        ))
    }
}

struct VariantDeserializer {
    payload: Option<Value>,
}

impl<'de> VariantAccess<'de> for VariantDeserializer {
    type Error = ValueError;

    fn unit_variant(self) -> ValueResult<()> {
        match self.payload {
            None | Some(Value::Null) => Ok(()),
            Some(other) => Err(ValueError::deserialization(format!(
                "unexpected payload for unit variant: {other}"
            ))),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> ValueResult<T::Value> {
        match self.payload {
            Some(value) => seed.deserialize(value),
            None => Err(ValueError::deserialization("missing newtype variant payload")),
        }
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> ValueResult<V::Value> {
        match self.payload {
            Some(Value::Array(items)) => visit_array(items, visitor),
            _ => Err(ValueError::deserialization("expected tuple variant payload")),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> ValueResult<V::Value> {
        match self.payload {
            Some(value @ (Value::Record(_) | Value::Map(_))) => {
                de::Deserializer::deserialize_any(value, visitor)
            }
            _ => Err(ValueError::deserialization("expected struct variant payload")),
        }
    }
}
