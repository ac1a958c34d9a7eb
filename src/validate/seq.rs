use crate::descriptor::{CollectionKind, Descriptor, TupleShape};
use crate::value::Value;

use super::{compile, Predicate};

pub(super) fn collection_validator(kind: CollectionKind, element: Option<&Descriptor>) -> Predicate {
    match element {
        None => Predicate::new(move |v| is_kind(kind, v)),
        Some(element) => {
            let element = compile(element);
            Predicate::new(move |v| is_kind(kind, v) && every_element(v, |x| element.check(x)))
        }
    }
}

pub(super) fn mapping_validator(key: &Descriptor, value: &Descriptor) -> Predicate {
    let key = compile(key);
    let value = compile(value);
    Predicate::new(move |v| match v {
        Value::Mapping(m) => m.iter().all(|(k, x)| key.check(k) && value.check(x)),
        _ => false,
    })
}

pub(super) fn tuple_validator(shape: &TupleShape) -> Predicate {
    match shape {
        TupleShape::Empty => Predicate::new(|v| matches!(v, Value::Tuple(xs) if xs.is_empty())),
        TupleShape::Fixed(elems) => {
            let elems: Vec<Predicate> = elems.iter().map(compile).collect();
            Predicate::new(move |v| {
                matches!(v, Value::Tuple(xs)
                    if xs.len() == elems.len() && xs.iter().zip(&elems).all(|(x, p)| p.check(x)))
            })
        }
        TupleShape::Variadic(element) => {
            let element = compile(element);
            Predicate::new(move |v| matches!(v, Value::Tuple(xs) if xs.iter().all(|x| element.check(x))))
        }
    }
}

fn is_kind(kind: CollectionKind, v: &Value) -> bool {
    match kind {
        CollectionKind::List => matches!(v, Value::List(_)),
        CollectionKind::Set => matches!(v, Value::Set(_)),
        CollectionKind::FrozenSet => matches!(v, Value::FrozenSet(_)),
        CollectionKind::Sequence => {
            matches!(v, Value::List(_) | Value::Tuple(_) | Value::Str(_) | Value::Bytes(_))
        }
    }
}

/// Strings iterate as one-character strings, bytes as ints.
fn every_element(v: &Value, check: impl Fn(&Value) -> bool) -> bool {
    match v {
        Value::List(xs) | Value::Tuple(xs) | Value::Set(xs) | Value::FrozenSet(xs) => {
            xs.iter().all(check)
        }
        Value::Str(s) => s.chars().all(|c| check(&Value::Str(c.to_string()))),
        Value::Bytes(b) => b.iter().all(|&x| check(&Value::Int(i64::from(x)))),
        _ => false,
    }
}
