// src/value.rs
//! Decoded dynamic values.
//!
//! This is what a manifest parser hands us: scalars, sequences and mappings,
//! with no guarantee about their shape. Nothing in here knows about schemas;
//! see `descriptor` and `validate` for that.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

/// Insertion-ordered mapping, as decoded documents preserve key order.
pub type Mapping = IndexMap<Value, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Complex(Complex),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    FrozenSet(Vec<Value>),
    Mapping(Mapping),
    /// A type/class object rather than an instance of one.
    Type(ScalarType),
    Instance(Instance),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Complex {
    pub re: OrderedFloat<f64>,
    pub im: OrderedFloat<f64>,
}

/// An instance of a nominal type, with its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub ty: Nominal,
    pub fields: IndexMap<String, Value>,
}

// ————————————————————————————————————————————————————————————————————————————
// NOMINAL TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Handle to a nominal (declared) type.
///
/// Identity is the handle itself: two types with the same name are still
/// different types unless they share a handle. Subtyping follows the bases
/// declared at construction, so the hierarchy is acyclic.
#[derive(Clone)]
pub struct Nominal(Arc<NominalInfo>);

struct NominalInfo {
    name: String,
    bases: Vec<Nominal>,
}

impl Nominal {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_bases(name, [])
    }

    pub fn with_bases(name: impl Into<String>, bases: impl IntoIterator<Item = Nominal>) -> Self {
        Self(Arc::new(NominalInfo {
            name: name.into(),
            bases: bases.into_iter().collect(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn bases(&self) -> &[Nominal] {
        &self.0.bases
    }

    pub fn is_subtype_of(&self, other: &Nominal) -> bool {
        self == other || self.0.bases.iter().any(|b| b.is_subtype_of(other))
    }

    /// Build an instance value of this type.
    pub fn instance<K: Into<String>>(&self, fields: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Instance(Instance {
            ty: self.clone(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }

    /// The class object itself.
    pub fn type_value(&self) -> Value {
        Value::Type(ScalarType::Nominal(self.clone()))
    }
}

impl PartialEq for Nominal {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Nominal {}

impl Hash for Nominal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl fmt::Debug for Nominal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nominal({})", self.0.name)
    }
}

/// Leaf types: the builtins plus any declared nominal type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    Complex,
    Str,
    Bytes,
    None,
    Nominal(Nominal),
}

impl ScalarType {
    pub fn name(&self) -> &str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::Complex => "complex",
            ScalarType::Str => "str",
            ScalarType::Bytes => "bytes",
            ScalarType::None => "none",
            ScalarType::Nominal(n) => n.name(),
        }
    }

    /// Builtins are subtypes of themselves, and `bool` of `int`.
    pub fn is_subtype_of(&self, other: &ScalarType) -> bool {
        match (self, other) {
            (ScalarType::Nominal(a), ScalarType::Nominal(b)) => a.is_subtype_of(b),
            (ScalarType::Bool, ScalarType::Int) => true,
            (a, b) => a == b,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VALUE API
// ————————————————————————————————————————————————————————————————————————————

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn float(f: f64) -> Self {
        Value::Float(OrderedFloat(f))
    }

    pub fn complex(re: f64, im: f64) -> Self {
        Value::Complex(Complex { re: OrderedFloat(re), im: OrderedFloat(im) })
    }

    pub fn mapping<K: Into<Value>, V: Into<Value>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Value::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Complex(_) => "complex",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::FrozenSet(_) => "frozenset",
            Value::Mapping(_) => "mapping",
            Value::Type(_) => "type",
            Value::Instance(_) => "instance",
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Equality the way a dynamic host compares literals: numbers compare by
    /// value across kinds (`true == 1 == 1.0`), lists and tuples compare
    /// element-wise, everything else structurally.
    pub fn loosely_eq(&self, other: &Value) -> bool {
        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            return a.eq_value(b);
        }
        match (self, other) {
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_eq(y))
            }
            _ => self == other,
        }
    }

    fn as_number(&self) -> Option<Num> {
        match self {
            Value::Bool(b) => Some(Num::Int(*b as i64)),
            Value::Int(i) => Some(Num::Int(*i)),
            Value::Float(f) => Some(Num::Real(f.0)),
            Value::Complex(c) if c.im.0 == 0.0 => Some(Num::Real(c.re.0)),
            Value::Complex(c) => Some(Num::Complex(c.re.0, c.im.0)),
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Real(f64),
    Complex(f64, f64),
}

impl Num {
    fn eq_value(self, other: Num) -> bool {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => a == b,
            (Num::Int(i), Num::Real(f)) | (Num::Real(f), Num::Int(i)) => int_eq_float(i, f),
            (Num::Real(a), Num::Real(b)) => a == b,
            (Num::Complex(ar, ai), Num::Complex(br, bi)) => ar == br && ai == bi,
            _ => false,
        }
    }
}

fn int_eq_float(i: i64, f: f64) -> bool {
    // 2^63 is exactly representable; anything at or past it cannot be an i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    f.fract() == 0.0 && f >= -LIMIT && f < LIMIT && f as i64 == i
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::None => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.hash(state),
            Value::Complex(c) => c.hash(state),
            Value::Str(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::List(xs) | Value::Tuple(xs) | Value::Set(xs) | Value::FrozenSet(xs) => xs.hash(state),
            // mapping equality ignores order, so only the length is hashed
            Value::Mapping(m) => m.len().hash(state),
            Value::Type(t) => t.hash(state),
            Value::Instance(i) => {
                i.ty.hash(state);
                i.fields.len().hash(state);
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(xs: Vec<Value>) -> Self {
        Value::List(xs)
    }
}

/// JSON has no tuples, sets or bytes; arrays become lists and objects become
/// string-keyed mappings. Unsigned integers past `i64::MAX` become floats.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(xs) => Value::List(xs.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(m) => {
                Value::Mapping(m.into_iter().map(|(k, v)| (Value::Str(k), Value::from(v))).collect())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DESERIALIZE
// ————————————————————————————————————————————————————————————————————————————

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any decoded document value")
    }

    fn visit_bool<E>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E>(self, i: i64) -> Result<Value, E> {
        Ok(Value::Int(i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> Result<Value, E> {
        i64::try_from(u)
            .map(Value::Int)
            .map_err(|_| E::custom(format!("integer {u} does not fit in a signed 64-bit integer")))
    }

    fn visit_f64<E>(self, f: f64) -> Result<Value, E> {
        Ok(Value::float(f))
    }

    fn visit_str<E>(self, s: &str) -> Result<Value, E> {
        Ok(Value::Str(s.to_owned()))
    }

    fn visit_string<E>(self, s: String) -> Result<Value, E> {
        Ok(Value::Str(s))
    }

    fn visit_bytes<E>(self, b: &[u8]) -> Result<Value, E> {
        Ok(Value::Bytes(b.to_vec()))
    }

    fn visit_byte_buf<E>(self, b: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Bytes(b))
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::None)
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(el) = seq.next_element::<Value>()? {
            out.push(el);
        }
        Ok(Value::List(out))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut out = Mapping::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry::<Value, Value>()? {
            out.insert(k, v);
        }
        Ok(Value::Mapping(out))
    }
}

// ------------------------------- Tests ------------------------------------ //
