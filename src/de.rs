//! Typed reads from configuration nodes.
//!
//! This module bridges the node model to `serde`: a
//! [`NodeDeserializer`](NodeDeserializer) lets any `Deserialize`
//! implementation pull its value out of a [`Node`](::node::Node), which is
//! what backs [`Factory::get`](::Factory::get). Scalars are stored as
//! strings and coerced on demand, with YAML-style leniency: numbers parse
//! from trimmed scalars, booleans accept `true`/`false`/`yes`/`no`/`on`/
//! `off` in any case, and requesting a string from a sequence yields the
//! space-joined elements (with a trailing space) as a convenience for
//! single-string argument sinks.

use std::fmt;
use std::slice;

use serde::de::value::StringDeserializer;
use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};

use node::{Node, NodeKind};

/// Conversion failure raised while deserializing from a node.
///
/// The message is carried verbatim into
/// [`Error::BadConversion`](::Error::BadConversion) by the factory.
#[derive(Debug)]
pub struct DeError(String);

impl fmt::Display for DeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for DeError {}

impl de::Error for DeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        DeError(msg.to_string())
    }
}

/// A `serde::Deserializer` over a single configuration node.
pub struct NodeDeserializer<'a> {
    node: &'a Node,
}

impl<'a> NodeDeserializer<'a> {
    pub fn new(node: &'a Node) -> NodeDeserializer<'a> {
        NodeDeserializer { node }
    }

    fn scalar(&self) -> Result<&'a str, DeError> {
        match *self.node.kind() {
            NodeKind::Scalar(ref value) => Ok(value),
            ref other => Err(DeError(format!(
                "expected a scalar value, found {}",
                kind_name(other)
            ))),
        }
    }

    fn parse_signed(&self) -> Result<i64, DeError> {
        let value = self.scalar()?;
        value
            .trim()
            .parse()
            .map_err(|_| DeError(format!("cannot parse {:?} as an integer", value)))
    }

    fn parse_unsigned(&self) -> Result<u64, DeError> {
        let value = self.scalar()?;
        value
            .trim()
            .parse()
            .map_err(|_| DeError(format!("cannot parse {:?} as an unsigned integer", value)))
    }

    fn parse_float(&self) -> Result<f64, DeError> {
        let value = self.scalar()?;
        let trimmed = value.trim();
        if !looks_numeric(trimmed) {
            return Err(DeError(format!("cannot parse {:?} as a number", value)));
        }
        trimmed
            .parse()
            .map_err(|_| DeError(format!("cannot parse {:?} as a number", value)))
    }

    fn parse_bool(&self) -> Result<bool, DeError> {
        let value = self.scalar()?;
        bool_value(value.trim())
            .ok_or_else(|| DeError(format!("cannot parse {:?} as a boolean", value)))
    }

    /// Space-joins the stringified elements of a sequence, keeping the
    /// trailing space.
    fn joined(&self, items: &[Node]) -> Result<String, DeError> {
        let mut joined = String::new();
        for item in items {
            match item.as_scalar() {
                Some(value) => {
                    joined.push_str(value);
                    joined.push(' ');
                }
                None => {
                    return Err(DeError(
                        "only sequences of scalars can be joined into a string".to_string(),
                    ))
                }
            }
        }
        Ok(joined)
    }
}

fn kind_name(kind: &NodeKind) -> &'static str {
    match *kind {
        NodeKind::Null => "a null value",
        NodeKind::Scalar(_) => "a scalar",
        NodeKind::Sequence(_) => "a sequence",
        NodeKind::Mapping(_) => "a mapping",
    }
}

fn bool_value(value: &str) -> Option<bool> {
    for truthy in &["true", "yes", "on"] {
        if value.eq_ignore_ascii_case(truthy) {
            return Some(true);
        }
    }
    for falsy in &["false", "no", "off"] {
        if value.eq_ignore_ascii_case(falsy) {
            return Some(false);
        }
    }
    None
}

fn looks_numeric(value: &str) -> bool {
    value
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
        .unwrap_or(false)
}

impl<'de, 'a> Deserializer<'de> for NodeDeserializer<'a> {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match *self.node.kind() {
            NodeKind::Null => visitor.visit_unit(),
            NodeKind::Scalar(ref value) => {
                let trimmed = value.trim();
                if looks_numeric(trimmed) {
                    if let Ok(int) = trimmed.parse::<i64>() {
                        return visitor.visit_i64(int);
                    }
                    if let Ok(float) = trimmed.parse::<f64>() {
                        return visitor.visit_f64(float);
                    }
                }
                if let Some(b) = bool_value(trimmed) {
                    return visitor.visit_bool(b);
                }
                visitor.visit_str(value)
            }
            NodeKind::Sequence(_) => self.deserialize_seq(visitor),
            NodeKind::Mapping(_) => self.deserialize_map(visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_bool(self.parse_bool()?)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_i64(self.parse_signed()?)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_i64(self.parse_signed()?)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_i64(self.parse_signed()?)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_i64(self.parse_signed()?)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_u64(self.parse_unsigned()?)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_u64(self.parse_unsigned()?)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_u64(self.parse_unsigned()?)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_u64(self.parse_unsigned()?)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_f64(self.parse_float()?)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_f64(self.parse_float()?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        let value = self.scalar()?;
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(DeError(format!("cannot parse {:?} as a character", value))),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match *self.node.kind() {
            NodeKind::Scalar(ref value) => visitor.visit_str(value),
            NodeKind::Sequence(ref items) => visitor.visit_string(self.joined(items)?),
            ref other => Err(DeError(format!(
                "expected a string, found {}",
                kind_name(other)
            ))),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_bytes(self.scalar()?.as_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match *self.node.kind() {
            NodeKind::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match *self.node.kind() {
            NodeKind::Null => visitor.visit_unit(),
            ref other => Err(DeError(format!(
                "expected a null value, found {}",
                kind_name(other)
            ))),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match *self.node.kind() {
            NodeKind::Sequence(ref items) => visitor.visit_seq(SeqDeserializer {
                iter: items.iter(),
            }),
            ref other => Err(DeError(format!(
                "expected a sequence, found {}",
                kind_name(other)
            ))),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match *self.node.kind() {
            NodeKind::Mapping(ref entries) => visitor.visit_map(MapDeserializer {
                iter: entries.iter(),
                value: None,
            }),
            ref other => Err(DeError(format!(
                "expected a mapping, found {}",
                kind_name(other)
            ))),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        match *self.node.kind() {
            NodeKind::Scalar(ref value) => visitor.visit_enum(EnumDeserializer {
                variant: value.trim(),
                value: None,
            }),
            NodeKind::Mapping(ref entries) if entries.len() == 1 => {
                visitor.visit_enum(EnumDeserializer {
                    variant: &entries[0].0,
                    value: Some(&entries[0].1),
                })
            }
            ref other => Err(DeError(format!(
                "expected an enum variant, found {}",
                kind_name(other)
            ))),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_any(visitor)
    }
}

struct SeqDeserializer<'a> {
    iter: slice::Iter<'a, Node>,
}

impl<'de, 'a> SeqAccess<'de> for SeqDeserializer<'a> {
    type Error = DeError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, DeError>
    where
        T: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(node) => seed.deserialize(NodeDeserializer::new(node)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer<'a> {
    iter: slice::Iter<'a, (String, Node)>,
    value: Option<&'a Node>,
}

impl<'de, 'a> MapAccess<'de> for MapDeserializer<'a> {
    type Error = DeError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, DeError>
    where
        K: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(&(ref key, ref value)) => {
                self.value = Some(value);
                let key: StringDeserializer<DeError> = key.clone().into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, DeError>
    where
        V: DeserializeSeed<'de>,
    {
        let value = self.value.take().expect("value read before key");
        seed.deserialize(NodeDeserializer::new(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct EnumDeserializer<'a> {
    variant: &'a str,
    value: Option<&'a Node>,
}

impl<'de, 'a> EnumAccess<'de> for EnumDeserializer<'a> {
    type Error = DeError;
    type Variant = VariantDeserializer<'a>;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), DeError>
    where
        V: DeserializeSeed<'de>,
    {
        let variant: StringDeserializer<DeError> = self.variant.to_string().into_deserializer();
        let variant = seed.deserialize(variant)?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer<'a> {
    value: Option<&'a Node>,
}

impl<'de, 'a> VariantAccess<'de> for VariantDeserializer<'a> {
    type Error = DeError;

    fn unit_variant(self) -> Result<(), DeError> {
        match self.value {
            None => Ok(()),
            Some(node) if node.is_null() => Ok(()),
            Some(_) => Err(DeError("expected a unit variant".to_string())),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, DeError>
    where
        T: DeserializeSeed<'de>,
    {
        match self.value {
            Some(node) => seed.deserialize(NodeDeserializer::new(node)),
            None => Err(DeError("expected a value for the variant".to_string())),
        }
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value, DeError>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(node) => NodeDeserializer::new(node).deserialize_tuple(len, visitor),
            None => Err(DeError("expected a sequence for the variant".to_string())),
        }
    }

    fn struct_variant<V>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(node) => NodeDeserializer::new(node).deserialize_struct("", fields, visitor),
            None => Err(DeError("expected a mapping for the variant".to_string())),
        }
    }
}
