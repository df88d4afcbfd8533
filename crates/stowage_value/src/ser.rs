//! Conversion from any `Serialize` type into a [`Value`].

use crate::error::{ValueError, ValueResult};
use crate::timestamp::{parse_timestamp, TIMESTAMP_TOKEN};
use crate::value::{Field, Record, Value};
use serde::ser::{self, Serialize};

/// Converts a serializable value into a [`Value`].
///
/// Structs become [`Value::Record`] with fields in declaration order
/// (named after their serialized, i.e. renamed, names). Unit enum variants
/// become text; variants with data become [`Value::Variant`]. Fields
/// serialized through [`crate::timestamp`] become [`Value::Timestamp`].
///
/// # Errors
///
/// Returns an error if an unsigned integer exceeds `i64::MAX` or the type's
/// `Serialize` implementation fails.
pub fn to_value<T: ?Sized + Serialize>(value: &T) -> ValueResult<Value> {
    value.serialize(ValueSerializer)
}

/// Serializer producing [`Value`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = ValueError;

    type SerializeSeq = SeqSerializer;
    type SerializeTuple = SeqSerializer;
    type SerializeTupleStruct = SeqSerializer;
    type SerializeTupleVariant = VariantSeqSerializer;
    type SerializeMap = MapSerializer;
    type SerializeStruct = StructSerializer;
    type SerializeStructVariant = VariantStructSerializer;

    fn serialize_bool(self, v: bool) -> ValueResult<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> ValueResult<Value> {
        Ok(Value::Integer(i64::from(v)))
    }

    fn serialize_i16(self, v: i16) -> ValueResult<Value> {
        Ok(Value::Integer(i64::from(v)))
    }

    fn serialize_i32(self, v: i32) -> ValueResult<Value> {
        Ok(Value::Integer(i64::from(v)))
    }

    fn serialize_i64(self, v: i64) -> ValueResult<Value> {
        Ok(Value::Integer(v))
    }

    fn serialize_u8(self, v: u8) -> ValueResult<Value> {
        Ok(Value::Integer(i64::from(v)))
    }

    fn serialize_u16(self, v: u16) -> ValueResult<Value> {
        Ok(Value::Integer(i64::from(v)))
    }

    fn serialize_u32(self, v: u32) -> ValueResult<Value> {
        Ok(Value::Integer(i64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> ValueResult<Value> {
        i64::try_from(v)
            .map(Value::Integer)
            .map_err(|_| ValueError::IntegerOverflow)
    }

    fn serialize_f32(self, v: f32) -> ValueResult<Value> {
        Ok(Value::Float(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> ValueResult<Value> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> ValueResult<Value> {
        Ok(Value::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> ValueResult<Value> {
        Ok(Value::Text(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> ValueResult<Value> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> ValueResult<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> ValueResult<Value> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> ValueResult<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> ValueResult<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> ValueResult<Value> {
        Ok(Value::Text(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> ValueResult<Value> {
        let inner = value.serialize(self)?;
        if name != TIMESTAMP_TOKEN {
            return Ok(inner);
        }
        match inner {
            Value::Text(text) => parse_timestamp(&text).map(Value::Timestamp),
            Value::Timestamp(at) => Ok(Value::Timestamp(at)),
            other => Err(ValueError::invalid_timestamp(other.to_string())),
        }
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> ValueResult<Value> {
        Ok(Value::Variant(
            variant.to_string(),
            Box::new(value.serialize(self)?),
        ))
    }

    fn serialize_seq(self, len: Option<usize>) -> ValueResult<SeqSerializer> {
        Ok(SeqSerializer {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> ValueResult<SeqSerializer> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> ValueResult<SeqSerializer> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> ValueResult<VariantSeqSerializer> {
        Ok(VariantSeqSerializer {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> ValueResult<MapSerializer> {
        Ok(MapSerializer {
            pairs: Vec::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> ValueResult<StructSerializer> {
        Ok(StructSerializer {
            record: Record::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> ValueResult<VariantStructSerializer> {
        Ok(VariantStructSerializer {
            variant,
            record: Record::with_capacity(len),
        })
    }
}

/// Collects sequence and tuple elements.
#[derive(Debug)]
pub struct SeqSerializer {
    items: Vec<Value>,
}

impl ser::SerializeSeq for SeqSerializer {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> ValueResult<()> {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> ValueResult<Value> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTuple for SeqSerializer {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> ValueResult<()> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> ValueResult<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqSerializer {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> ValueResult<()> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> ValueResult<Value> {
        ser::SerializeSeq::end(self)
    }
}

/// Collects the elements of a tuple variant.
#[derive(Debug)]
pub struct VariantSeqSerializer {
    variant: &'static str,
    items: Vec<Value>,
}

impl ser::SerializeTupleVariant for VariantSeqSerializer {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> ValueResult<()> {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> ValueResult<Value> {
        Ok(Value::Variant(
            self.variant.to_string(),
            Box::new(Value::Array(self.items)),
        ))
    }
}

/// Collects map entries.
#[derive(Debug)]
pub struct MapSerializer {
    pairs: Vec<(Value, Value)>,
    next_key: Option<Value>,
}

impl ser::SerializeMap for MapSerializer {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> ValueResult<()> {
        self.next_key = Some(to_value(key)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> ValueResult<()> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| ValueError::serialization("map value without a key"))?;
        self.pairs.push((key, to_value(value)?));
        Ok(())
    }

    fn end(self) -> ValueResult<Value> {
        Ok(Value::Map(self.pairs))
    }
}

/// Collects struct fields into a [`Record`].
#[derive(Debug)]
pub struct StructSerializer {
    record: Record,
}

impl ser::SerializeStruct for StructSerializer {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> ValueResult<()> {
        self.record.push(Field::new(key), to_value(value)?);
        Ok(())
    }

    fn end(self) -> ValueResult<Value> {
        Ok(Value::Record(self.record))
    }
}

/// Collects the fields of a struct variant.
#[derive(Debug)]
pub struct VariantStructSerializer {
    variant: &'static str,
    record: Record,
}

impl ser::SerializeStructVariant for VariantStructSerializer {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> ValueResult<()> {
        self.record.push(Field::new(key), to_value(value)?);
        Ok(())
    }

    fn end(self) -> ValueResult<Value> {
        Ok(Value::Variant(
            self.variant.to_string(),
            Box::new(Value::Record(self.record)),
        ))
    }
}
