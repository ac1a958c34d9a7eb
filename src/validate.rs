// src/validate.rs
//! Validator compiler and cache.
//!
//! `compile` turns a descriptor into a `Predicate` once and memoizes it in a
//! process-wide map keyed by the descriptor. Nested descriptors are compiled
//! through the same entry point, so every sub-schema is cached too.
//!
//! The cache is append-only. Two threads missing on the same key both build
//! a predicate; the first insert is kept and the other copy is dropped.
//! Building is a pure function of the descriptor, so either would do.
mod seq;
mod typed;

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::descriptor::Descriptor;
use crate::value::{Nominal, ScalarType, Value};

/// A compiled shape check. Cheap to clone.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl Predicate {
    pub fn new(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.0)(value)
    }

    /// Same compiled closure, not merely an equivalent one.
    pub fn ptr_eq(&self, other: &Predicate) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

static VALIDATORS: Lazy<DashMap<Descriptor, Predicate>> = Lazy::new(DashMap::new);

// ------------------------------- Front API -------------------------------- //

pub fn compile(descriptor: &Descriptor) -> Predicate {
    // Release the shard before building: nested compiles re-enter the map.
    let hit = VALIDATORS.get(descriptor).map(|p| p.value().clone());
    if let Some(predicate) = hit {
        return predicate;
    }
    let built = build(descriptor);
    tracing::trace!(kind = descriptor.kind(), "compiled validator");
    VALIDATORS.entry(descriptor.clone()).or_insert(built).value().clone()
}

pub fn validate(descriptor: &Descriptor, value: &Value) -> bool {
    compile(descriptor).check(value)
}

pub fn cached_validator_count() -> usize {
    VALIDATORS.len()
}

// ---------------------------- Classification ------------------------------ //

fn build(descriptor: &Descriptor) -> Predicate {
    // Arm order is the classification priority.
    match descriptor {
        Descriptor::Any => Predicate::new(|_| true),
        Descriptor::Union(members) => {
            let members: Vec<Predicate> = members.iter().map(compile).collect();
            Predicate::new(move |v| members.iter().any(|p| p.check(v)))
        }
        Descriptor::TypedRecord(rec) => typed::record_validator(rec),
        Descriptor::NewType { underlying, .. } => compile(underlying),
        Descriptor::Literal(allowed) => {
            let allowed = allowed.clone();
            Predicate::new(move |v| allowed.iter().any(|x| x.loosely_eq(v)))
        }
        Descriptor::FieldWrapper(inner) => compile(inner.as_deref().unwrap_or(&Descriptor::Any)),
        Descriptor::Collection { kind, element } => seq::collection_validator(*kind, element.as_deref()),
        Descriptor::Mapping { key, value } => seq::mapping_validator(key, value),
        Descriptor::Tuple(shape) => seq::tuple_validator(shape),
        Descriptor::TypeOf(bound) => type_of_validator(bound.as_deref()),
        Descriptor::Record(ty) => {
            let ty = ty.clone();
            Predicate::new(move |v| is_instance(v, &ty))
        }
        Descriptor::Scalar(ty) => scalar_validator(ty),
    }
}

fn type_of_validator(bound: Option<&Descriptor>) -> Predicate {
    match bound {
        None => Predicate::new(|v| matches!(v, Value::Type(_))),
        Some(bound) => {
            let bound = bound.clone();
            Predicate::new(move |v| matches!(v, Value::Type(t) if is_subclass(t, &bound)))
        }
    }
}

/// Whether a class object falls under a `TypeOf` bound. Bounds that do not
/// name a type (collections, literals, records of keys) never match.
fn is_subclass(ty: &ScalarType, bound: &Descriptor) -> bool {
    match bound {
        Descriptor::Any => true,
        Descriptor::Scalar(b) => ty.is_subtype_of(b),
        Descriptor::Record(n) => matches!(ty, ScalarType::Nominal(t) if t.is_subtype_of(n)),
        Descriptor::Union(members) => members.iter().any(|m| is_subclass(ty, m)),
        Descriptor::NewType { underlying, .. } => is_subclass(ty, underlying),
        Descriptor::FieldWrapper(inner) => inner.as_deref().is_none_or(|d| is_subclass(ty, d)),
        _ => false,
    }
}

fn is_instance(value: &Value, ty: &Nominal) -> bool {
    matches!(value, Value::Instance(i) if i.ty.is_subtype_of(ty))
}

fn scalar_validator(ty: &ScalarType) -> Predicate {
    match ty {
        // widening: booleans are ints, whole numbers are reals, reals are complex
        ScalarType::Int => Predicate::new(|v| matches!(v, Value::Bool(_) | Value::Int(_))),
        ScalarType::Float => {
            Predicate::new(|v| matches!(v, Value::Bool(_) | Value::Int(_) | Value::Float(_)))
        }
        ScalarType::Complex => Predicate::new(|v| {
            matches!(v, Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Complex(_))
        }),
        ScalarType::Bool => Predicate::new(|v| matches!(v, Value::Bool(_))),
        ScalarType::Str => Predicate::new(|v| matches!(v, Value::Str(_))),
        ScalarType::Bytes => Predicate::new(|v| matches!(v, Value::Bytes(_))),
        ScalarType::None => Predicate::new(|v| matches!(v, Value::None)),
        ScalarType::Nominal(n) => {
            let n = n.clone();
            Predicate::new(move |v| is_instance(v, &n))
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
