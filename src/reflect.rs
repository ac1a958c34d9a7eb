// src/reflect.rs
//! Descriptors derived from Rust types.
//!
//! `Reflect` covers the builtin shapes; `Record` is implemented by declared
//! product types that want a field-validator table (see `fields`).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;

use crate::descriptor::Descriptor;
use crate::value::{Nominal, ScalarType, Value};

pub trait Reflect {
    fn descriptor() -> Descriptor;
}

/// A nominal product type with declared fields.
pub trait Record {
    /// Must hand out the same handle on every call; keep it in a static.
    fn nominal() -> Nominal;

    /// Declared fields, in declaration order. A field may name its own
    /// record type through `Descriptor::Record(Self::nominal())`.
    fn fields() -> Vec<(&'static str, Descriptor)>;
}

macro_rules! reflect_scalar {
    ($scalar:expr => $($ty:ty),+) => {
        $(
            impl Reflect for $ty {
                fn descriptor() -> Descriptor {
                    Descriptor::Scalar($scalar)
                }
            }
        )+
    };
}

reflect_scalar!(ScalarType::Bool => bool);
reflect_scalar!(ScalarType::Int => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
reflect_scalar!(ScalarType::Float => f32, f64);
reflect_scalar!(ScalarType::Str => str, String);

impl Reflect for Value {
    fn descriptor() -> Descriptor {
        Descriptor::Any
    }
}

impl Reflect for () {
    fn descriptor() -> Descriptor {
        Descriptor::tuple(Vec::new())
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn descriptor() -> Descriptor {
        Descriptor::optional(T::descriptor())
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn descriptor() -> Descriptor {
        Descriptor::list(T::descriptor())
    }
}

impl<T: Reflect> Reflect for BTreeSet<T> {
    fn descriptor() -> Descriptor {
        Descriptor::set(T::descriptor())
    }
}

impl<T: Reflect, S> Reflect for HashSet<T, S> {
    fn descriptor() -> Descriptor {
        Descriptor::set(T::descriptor())
    }
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn descriptor() -> Descriptor {
        Descriptor::mapping(K::descriptor(), V::descriptor())
    }
}

impl<K: Reflect, V: Reflect, S> Reflect for HashMap<K, V, S> {
    fn descriptor() -> Descriptor {
        Descriptor::mapping(K::descriptor(), V::descriptor())
    }
}

impl<K: Reflect, V: Reflect, S> Reflect for IndexMap<K, V, S> {
    fn descriptor() -> Descriptor {
        Descriptor::mapping(K::descriptor(), V::descriptor())
    }
}

macro_rules! reflect_tuple {
    ($($name:ident),+) => {
        impl<$($name: Reflect),+> Reflect for ($($name,)+) {
            fn descriptor() -> Descriptor {
                Descriptor::tuple(vec![$($name::descriptor()),+])
            }
        }
    };
}

reflect_tuple!(A);
reflect_tuple!(A, B);
reflect_tuple!(A, B, C);
reflect_tuple!(A, B, C, D);

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate;
    use serde_json::json;

    #[test]
    fn builtin_shapes() {
        assert_eq!(<Option<i64>>::descriptor(), Descriptor::optional(Descriptor::Scalar(ScalarType::Int)));
        assert_eq!(
            <BTreeMap<String, Vec<String>>>::descriptor(),
            Descriptor::mapping(
                Descriptor::Scalar(ScalarType::Str),
                Descriptor::list(Descriptor::Scalar(ScalarType::Str))
            )
        );
        for d in [usize::descriptor(), isize::descriptor(), u64::descriptor()] {
            assert_eq!(d, Descriptor::Scalar(ScalarType::Int));
        }
        assert_eq!(<()>::descriptor(), Descriptor::tuple(vec![]));
        assert_eq!(
            <(i32, String)>::descriptor(),
            Descriptor::tuple(vec![Descriptor::Scalar(ScalarType::Int), Descriptor::Scalar(ScalarType::Str)])
        );
    }

    #[test]
    fn reflected_descriptors_validate_decoded_values() {
        let features = <HashMap<String, Vec<String>>>::descriptor();
        assert!(validate(&features, &Value::from(json!({"default": ["std"], "std": []}))));
        assert!(!validate(&features, &Value::from(json!({"default": "std"}))));

        let maybe_f = <Option<f64>>::descriptor();
        assert!(validate(&maybe_f, &Value::Int(3)));
        assert!(validate(&maybe_f, &Value::None));
    }
}
