//! Structural validation of decoded manifest values.
//!
//! A [`descriptor::Descriptor`] says what shape a value must have; the
//! [`validate`](mod@validate) module compiles it once into a cached [`validate::Predicate`]
//! and answers yes or no for any [`value::Value`]. Record types get a cached
//! per-field table through [`fields::field_validators`].
//!
//! ```
//! use shape_check::{descriptor::Descriptor, validate::validate, value::{ScalarType, Value}};
//!
//! let strs = Descriptor::list(Descriptor::Scalar(ScalarType::Str));
//! assert!(validate(&strs, &Value::List(vec![Value::str("a")])));
//! ```
pub mod cli;
pub mod decode;
pub mod descriptor;
pub mod fields;
pub mod manifest;
pub mod reflect;
pub mod validate;
pub mod value;

pub use descriptor::{Descriptor, SchemaError, TypedRecordBuilder};
pub use fields::{FieldReport, FieldValidators, field_validators, field_validators_for};
pub use reflect::{Record, Reflect};
pub use validate::{Predicate, compile, validate};
pub use value::{Nominal, ScalarType, Value};
