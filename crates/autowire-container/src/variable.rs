//! # Variables
//!
//! Named configuration values held by the container. Names are dotted paths
//! (`server.port`), values are loosely typed [`Value`]s, and the last registration of a name
//! wins: loaders run defaults first and overrides later, so layering falls out of the
//! overwrite rule.

use crate::context::ApplicationContext;
use crate::error::BoxError;
use serde::de::value::{
    Error as SectionError, MapDeserializer, SeqDeserializer, StringDeserializer,
};
use serde::de::{
    self, DeserializeOwned, Deserializer, IntoDeserializer, Unexpected, Visitor,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// A configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

/// Thread-safe variable registry.
#[derive(Debug, Default)]
pub struct VariableStore {
    variables: RwLock<HashMap<String, Value>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under `name`, replacing any earlier value.
    pub fn register(&self, name: &str, value: Value) {
        debug!(name, kind = value.kind(), "Registering variable");
        self.variables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.variables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// The rendered value, or an empty string when the variable is missing.
    pub fn get_string(&self, name: &str) -> String {
        self.get(name).map(|v| v.to_string()).unwrap_or_default()
    }

    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.variables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.variables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Typed accessors over a context's variables, each with a fallback for missing or
/// unparseable values.
pub struct VariableHelper<'a, C: ?Sized> {
    ctx: &'a C,
}

impl<'a, C: ApplicationContext + ?Sized> VariableHelper<'a, C> {
    pub fn new(ctx: &'a C) -> Self {
        Self { ctx }
    }

    pub fn get_string(&self, name: &str, default: &str) -> String {
        let value = self.ctx.get_variable(name);
        if value.is_empty() {
            default.to_string()
        } else {
            value
        }
    }

    pub fn get_int(&self, name: &str, default: i64) -> i64 {
        match self.ctx.get_variable_raw(name) {
            Some(Value::Integer(i)) => i,
            Some(Value::Float(x)) => x as i64,
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn get_float(&self, name: &str, default: f64) -> f64 {
        match self.ctx.get_variable_raw(name) {
            Some(Value::Float(x)) => x,
            Some(Value::Integer(i)) => i as f64,
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.ctx.get_variable_raw(name) {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => match s.trim() {
                "true" | "yes" | "1" => true,
                "false" | "no" | "0" => false,
                _ => default,
            },
            _ => default,
        }
    }

    /// Deserializes the section under `prefix` into `T`.
    ///
    /// A map-valued variable named exactly `prefix` is used as-is; otherwise every
    /// `prefix.*` variable is folded back into a nested map first. Scalars are read as
    /// leniently as the typed getters: `"9090"` fills a `u16` field and `8080` fills a
    /// `String` one, so a string override from the environment still matches a typed default.
    pub fn get_struct<T: DeserializeOwned>(&self, prefix: &str) -> Result<T, BoxError> {
        let section = match self.ctx.get_variable_raw(prefix) {
            Some(map @ Value::Map(_)) => map,
            _ => {
                let nested = unflatten(prefix, &self.ctx.get_variables());
                if nested.is_empty() {
                    return Err(format!("variable {prefix} not found").into());
                }
                Value::Map(nested)
            }
        };
        Ok(T::deserialize(Section(section))?)
    }
}

/// Rebuilds a nested map from the dotted keys under `prefix`.
///
/// When a name is both a scalar and a section (`db.pool` next to `db.pool.size`), the section
/// wins.
fn unflatten(prefix: &str, variables: &HashMap<String, Value>) -> BTreeMap<String, Value> {
    let dotted = format!("{prefix}.");
    let sorted: BTreeMap<&str, &Value> = variables
        .iter()
        .filter_map(|(key, value)| Some((key.strip_prefix(&dotted)?, value)))
        .collect();

    let mut root = BTreeMap::new();
    for (rest, value) in sorted {
        let path: Vec<&str> = rest.split('.').collect();
        insert_path(&mut root, &path, value.clone());
    }
    root
}

fn insert_path(section: &mut BTreeMap<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [leaf] => {
            if let Some(Value::Map(_)) = section.get(*leaf) {
                debug!(key = *leaf, "Scalar shadowed by a nested section");
                return;
            }
            section.insert(leaf.to_string(), value);
        }
        [head, rest @ ..] => {
            let mut child = match section.remove(*head) {
                Some(Value::Map(map)) => map,
                _ => BTreeMap::new(),
            };
            insert_path(&mut child, rest, value);
            section.insert(head.to_string(), Value::Map(child));
        }
    }
}

/// Deserializer over a [`Value`] that parses string scalars on demand.
struct Section(Value);

impl<'de> IntoDeserializer<'de, SectionError> for Section {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! parse_scalar {
    ($($method:ident => $visit:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SectionError> {
                match self.0 {
                    Value::String(s) => match s.trim().parse::<$ty>() {
                        Ok(parsed) => visitor.$visit(parsed),
                        Err(_) => Err(de::Error::invalid_value(Unexpected::Str(&s), &visitor)),
                    },
                    other => Section(other).deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for Section {
    type Error = SectionError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SectionError> {
        match self.0 {
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Integer(i) => visitor.visit_i64(i),
            Value::Float(x) => visitor.visit_f64(x),
            Value::String(s) => visitor.visit_string(s),
            Value::List(items) => {
                let mut seq: SeqDeserializer<_, SectionError> =
                    SeqDeserializer::new(items.into_iter().map(Section));
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            Value::Map(entries) => {
                let mut map: MapDeserializer<'de, _, SectionError> =
                    MapDeserializer::new(entries.into_iter().map(|(k, v)| (k, Section(v))));
                let value = visitor.visit_map(&mut map)?;
                map.end()?;
                Ok(value)
            }
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SectionError> {
        match self.0 {
            Value::String(s) => match s.trim() {
                "true" | "yes" | "1" => visitor.visit_bool(true),
                "false" | "no" | "0" => visitor.visit_bool(false),
                _ => Err(de::Error::invalid_value(Unexpected::Str(&s), &visitor)),
            },
            other => Section(other).deserialize_any(visitor),
        }
    }

    parse_scalar! {
        deserialize_i8 => visit_i64(i64),
        deserialize_i16 => visit_i64(i64),
        deserialize_i32 => visit_i64(i64),
        deserialize_i64 => visit_i64(i64),
        deserialize_u8 => visit_u64(u64),
        deserialize_u16 => visit_u64(u64),
        deserialize_u32 => visit_u64(u64),
        deserialize_u64 => visit_u64(u64),
        deserialize_f32 => visit_f64(f64),
        deserialize_f64 => visit_f64(f64),
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SectionError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SectionError> {
        match self.0 {
            scalar @ (Value::Bool(_) | Value::Integer(_) | Value::Float(_)) => {
                visitor.visit_string(scalar.to_string())
            }
            other => Section(other).deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SectionError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, SectionError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, SectionError> {
        match self.0 {
            Value::String(s) => {
                let variant: StringDeserializer<SectionError> = s.into_deserializer();
                visitor.visit_enum(variant)
            }
            other => Section(other).deserialize_any(visitor),
        }
    }

    serde::forward_to_deserialize_any! {
        char bytes byte_buf unit unit_struct seq tuple tuple_struct map struct identifier
        ignored_any
    }
}
