// src/descriptor.rs
//! Schema descriptors: what shape a decoded value must have.
//!
//! Descriptors are built once (usually from `reflect::Reflect` or by hand
//! through the constructors below) and then only read. Equality is structural,
//! except for nominal types which compare by identity; that equality is what
//! the validator cache keys on.

use std::collections::BTreeSet;

use serde_json::json;
use thiserror::Error;

use crate::value::{Nominal, ScalarType, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Descriptor {
    Any,
    /// Matches if any member matches. `Optional[T]` is `Union([T, None])`.
    Union(Vec<Descriptor>),
    /// Transparent alias.
    NewType { name: String, underlying: Box<Descriptor> },
    /// Allowed values, compared with `Value::loosely_eq`.
    Literal(Vec<Value>),
    /// Init-only field wrapper; `None` inner means `Any`.
    FieldWrapper(Option<Box<Descriptor>>),
    Collection { kind: CollectionKind, element: Option<Box<Descriptor>> },
    Mapping { key: Box<Descriptor>, value: Box<Descriptor> },
    Tuple(TupleShape),
    TypedRecord(TypedRecord),
    /// The value is a class object, optionally bounded.
    TypeOf(Option<Box<Descriptor>>),
    /// Nominal instance check; never looks at the type's fields.
    Record(Nominal),
    Scalar(ScalarType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    List,
    Set,
    FrozenSet,
    Sequence,
}

impl CollectionKind {
    pub fn name(self) -> &'static str {
        match self {
            CollectionKind::List => "list",
            CollectionKind::Set => "set",
            CollectionKind::FrozenSet => "frozenset",
            CollectionKind::Sequence => "sequence",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TupleShape {
    Empty,
    Fixed(Vec<Descriptor>),
    Variadic(Box<Descriptor>),
}

/// Keyed record with open (`total = false`) or closed (`total = true`) key
/// set. Requiredness is per field and independent of `total`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedRecord {
    pub name: String,
    pub total: bool,
    pub fields: Vec<RecordField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordField {
    pub name: String,
    pub descriptor: Descriptor,
    /// Set only by an explicit required marker on the field.
    pub required: bool,
}

impl TypedRecord {
    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.required).map(|f| f.name.as_str())
    }

    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("record `{record}` declares field `{field}` more than once")]
    DuplicateField { record: String, field: String },
    #[error("record `{record}` declares a field with an empty name")]
    EmptyFieldName { record: String },
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDERS
// ————————————————————————————————————————————————————————————————————————————

pub struct TypedRecordBuilder {
    record: TypedRecord,
}

impl TypedRecordBuilder {
    pub fn new(name: impl Into<String>, total: bool) -> Self {
        Self { record: TypedRecord { name: name.into(), total, fields: Vec::new() } }
    }

    /// Closed record: undeclared keys are rejected.
    pub fn closed(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }

    /// Open record: undeclared keys pass unchecked.
    pub fn open(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }

    pub fn field(self, name: impl Into<String>, descriptor: Descriptor) -> Self {
        self.push(name.into(), descriptor, false)
    }

    pub fn required(self, name: impl Into<String>, descriptor: Descriptor) -> Self {
        self.push(name.into(), descriptor, true)
    }

    fn push(mut self, name: String, descriptor: Descriptor, required: bool) -> Self {
        self.record.fields.push(RecordField { name, descriptor, required });
        self
    }

    pub fn build(self) -> Result<Descriptor, SchemaError> {
        let record = self.record;
        let mut seen = BTreeSet::new();
        for f in &record.fields {
            if f.name.is_empty() {
                return Err(SchemaError::EmptyFieldName { record: record.name.clone() });
            }
            if !seen.insert(f.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    record: record.name.clone(),
                    field: f.name.clone(),
                });
            }
        }
        Ok(Descriptor::TypedRecord(record))
    }
}

impl Descriptor {
    pub fn scalar(ty: ScalarType) -> Self {
        Descriptor::Scalar(ty)
    }

    pub fn optional(inner: Descriptor) -> Self {
        Descriptor::Union(vec![inner, Descriptor::Scalar(ScalarType::None)])
    }

    pub fn list(element: Descriptor) -> Self {
        Self::collection(CollectionKind::List, element)
    }

    pub fn set(element: Descriptor) -> Self {
        Self::collection(CollectionKind::Set, element)
    }

    pub fn collection(kind: CollectionKind, element: Descriptor) -> Self {
        Descriptor::Collection { kind, element: Some(Box::new(element)) }
    }

    /// Container with no declared element type.
    pub fn untyped(kind: CollectionKind) -> Self {
        Descriptor::Collection { kind, element: None }
    }

    pub fn mapping(key: Descriptor, value: Descriptor) -> Self {
        Descriptor::Mapping { key: Box::new(key), value: Box::new(value) }
    }

    pub fn untyped_mapping() -> Self {
        Self::mapping(Descriptor::Any, Descriptor::Any)
    }

    pub fn literal<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Descriptor::Literal(values.into_iter().map(Into::into).collect())
    }

    pub fn new_type(name: impl Into<String>, underlying: Descriptor) -> Self {
        Descriptor::NewType { name: name.into(), underlying: Box::new(underlying) }
    }

    pub fn tuple(elems: Vec<Descriptor>) -> Self {
        if elems.is_empty() {
            Descriptor::Tuple(TupleShape::Empty)
        } else {
            Descriptor::Tuple(TupleShape::Fixed(elems))
        }
    }

    pub fn variadic_tuple(element: Descriptor) -> Self {
        Descriptor::Tuple(TupleShape::Variadic(Box::new(element)))
    }

    pub fn record(ty: &Nominal) -> Self {
        Descriptor::Record(ty.clone())
    }

    pub fn type_of(bound: Option<Descriptor>) -> Self {
        Descriptor::TypeOf(bound.map(Box::new))
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Descriptor::Any => "any",
            Descriptor::Union(_) => "union",
            Descriptor::NewType { .. } => "newtype",
            Descriptor::Literal(_) => "literal",
            Descriptor::FieldWrapper(_) => "field-wrapper",
            Descriptor::Collection { .. } => "collection",
            Descriptor::Mapping { .. } => "mapping",
            Descriptor::Tuple(_) => "tuple",
            Descriptor::TypedRecord(_) => "typed-record",
            Descriptor::TypeOf(_) => "type-of",
            Descriptor::Record(_) => "record",
            Descriptor::Scalar(_) => "scalar",
        }
    }

    /// JSON-schema-ish debug view. Not a round-trippable format.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Descriptor::Any => json!({}),
            Descriptor::Union(members) => {
                json!({ "anyOf": members.iter().map(Descriptor::to_json).collect::<Vec<_>>() })
            }
            Descriptor::NewType { name, underlying } => {
                let mut out = underlying.to_json();
                if let Some(obj) = out.as_object_mut() {
                    obj.insert("title".into(), json!(name));
                }
                out
            }
            Descriptor::Literal(values) => {
                json!({ "enum": values.iter().map(literal_json).collect::<Vec<_>>() })
            }
            Descriptor::FieldWrapper(inner) => inner.as_deref().map_or(json!({}), Descriptor::to_json),
            Descriptor::Collection { kind, element } => {
                let mut out = json!({ "type": "array", "x-kind": kind.name() });
                if let Some(el) = element {
                    out["items"] = el.to_json();
                }
                if matches!(kind, CollectionKind::Set | CollectionKind::FrozenSet) {
                    out["uniqueItems"] = json!(true);
                }
                out
            }
            Descriptor::Mapping { key, value } => json!({
                "type": "object",
                "propertyNames": key.to_json(),
                "additionalProperties": value.to_json(),
            }),
            Descriptor::Tuple(TupleShape::Empty) => json!({ "type": "array", "maxItems": 0 }),
            Descriptor::Tuple(TupleShape::Fixed(elems)) => json!({
                "type": "array",
                "prefixItems": elems.iter().map(Descriptor::to_json).collect::<Vec<_>>(),
                "minItems": elems.len(),
                "maxItems": elems.len(),
            }),
            Descriptor::Tuple(TupleShape::Variadic(el)) => json!({ "type": "array", "items": el.to_json() }),
            Descriptor::TypedRecord(rec) => {
                let props: serde_json::Map<String, serde_json::Value> = rec
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), f.descriptor.to_json()))
                    .collect();
                json!({
                    "title": rec.name,
                    "type": "object",
                    "properties": props,
                    "required": rec.required_names().collect::<Vec<_>>(),
                    "additionalProperties": !rec.total,
                })
            }
            Descriptor::TypeOf(bound) => match bound {
                None => json!({ "x-type-of": {} }),
                Some(b) => json!({ "x-type-of": b.to_json() }),
            },
            Descriptor::Record(ty) => json!({ "x-instance-of": ty.name() }),
            Descriptor::Scalar(ty) => scalar_json(ty),
        }
    }
}

fn scalar_json(ty: &ScalarType) -> serde_json::Value {
    match ty {
        ScalarType::Bool => json!({ "type": "boolean" }),
        ScalarType::Int => json!({ "type": "integer" }),
        ScalarType::Float => json!({ "type": "number" }),
        ScalarType::Complex => json!({ "type": "number", "x-kind": "complex" }),
        ScalarType::Str => json!({ "type": "string" }),
        ScalarType::Bytes => json!({ "type": "string", "contentEncoding": "binary" }),
        ScalarType::None => json!({ "type": "null" }),
        ScalarType::Nominal(n) => json!({ "x-instance-of": n.name() }),
    }
}

fn literal_json(v: &Value) -> serde_json::Value {
    match v {
        Value::None => json!(null),
        Value::Bool(b) => json!(b),
        Value::Int(i) => json!(i),
        Value::Float(f) => json!(f.0),
        Value::Str(s) => json!(s),
        other => json!(format!("<{}>", other.type_name())),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_duplicate_fields() {
        let err = TypedRecordBuilder::open("Pkg")
            .required("name", Descriptor::Scalar(ScalarType::Str))
            .field("name", Descriptor::Any)
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateField { record: "Pkg".into(), field: "name".into() });
    }

    #[test]
    fn builder_rejects_empty_field_name() {
        let err = TypedRecordBuilder::closed("Pkg").field("", Descriptor::Any).build().unwrap_err();
        assert!(matches!(err, SchemaError::EmptyFieldName { .. }));
    }

    #[test]
    fn requiredness_is_per_field() {
        let d = TypedRecordBuilder::closed("Pkg")
            .required("name", Descriptor::Scalar(ScalarType::Str))
            .field("version", Descriptor::Scalar(ScalarType::Str))
            .build()
            .unwrap();
        let Descriptor::TypedRecord(rec) = d else { panic!("expected a typed record") };
        assert_eq!(rec.required_names().collect::<Vec<_>>(), vec!["name"]);
        assert!(rec.total);
        assert!(!rec.field("version").unwrap().required);
    }

    #[test]
    fn nominal_descriptors_compare_by_identity() {
        let a = Nominal::new("A");
        let a2 = Nominal::new("A");
        assert_eq!(Descriptor::record(&a), Descriptor::record(&a.clone()));
        assert_ne!(Descriptor::record(&a), Descriptor::record(&a2));
        assert_eq!(
            Descriptor::list(Descriptor::Scalar(ScalarType::Int)),
            Descriptor::list(Descriptor::Scalar(ScalarType::Int))
        );
    }

    #[test]
    fn empty_fixed_tuple_collapses_to_empty() {
        assert_eq!(Descriptor::tuple(vec![]), Descriptor::Tuple(TupleShape::Empty));
    }

    #[test]
    fn json_view_of_closed_record() {
        let d = TypedRecordBuilder::closed("Pkg")
            .required("name", Descriptor::Scalar(ScalarType::Str))
            .field("edition", Descriptor::literal(["2018", "2021"]))
            .build()
            .unwrap();
        let view = d.to_json();
        assert_eq!(view["additionalProperties"], json!(false));
        assert_eq!(view["required"], json!(["name"]));
        assert_eq!(view["properties"]["edition"]["enum"], json!(["2018", "2021"]));
    }
}
