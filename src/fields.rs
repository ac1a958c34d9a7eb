// src/fields.rs
//! Per-record field-validator tables.
//!
//! A manifest loader walks a decoded mapping key by key: it needs to know
//! whether a key names a declared field and whether the value fits that
//! field. Tables are built once per nominal type and shared afterwards.
//! Requiredness and closedness are not checked here.

use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::descriptor::Descriptor;
use crate::reflect::Record;
use crate::validate::{compile, Predicate};
use crate::value::{Mapping, Nominal, Value};

#[derive(Debug)]
pub struct FieldValidators {
    record: String,
    validators: IndexMap<String, Predicate>,
}

/// Outcome of walking a mapping against a table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldReport {
    /// Declared fields whose value has the wrong shape.
    pub invalid: Vec<String>,
    /// Keys that name no declared field. Non-string keys are rendered as
    /// `<type>`.
    pub unknown: Vec<String>,
}

impl FieldReport {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty() && self.unknown.is_empty()
    }
}

impl FieldValidators {
    pub fn record_name(&self) -> &str {
        &self.record
    }

    pub fn get(&self, name: &str) -> Option<&Predicate> {
        self.validators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// `None` when `name` is not a declared field.
    pub fn check(&self, name: &str, value: &Value) -> Option<bool> {
        self.validators.get(name).map(|p| p.check(value))
    }

    pub fn partition(&self, mapping: &Mapping) -> FieldReport {
        let mut report = FieldReport::default();
        for (key, value) in mapping {
            let Some(name) = key.as_str() else {
                report.unknown.push(format!("<{}>", key.type_name()));
                continue;
            };
            match self.check(name, value) {
                None => report.unknown.push(name.to_owned()),
                Some(false) => report.invalid.push(name.to_owned()),
                Some(true) => {}
            }
        }
        report
    }
}

static FIELD_VALIDATORS: Lazy<DashMap<Nominal, Arc<FieldValidators>>> = Lazy::new(DashMap::new);

pub fn field_validators<T: Record>() -> Arc<FieldValidators> {
    field_validators_for(&T::nominal(), T::fields)
}

/// Table for `ty`, building it from `fields` on first use.
pub fn field_validators_for<S: Into<String>>(
    ty: &Nominal,
    fields: impl FnOnce() -> Vec<(S, Descriptor)>,
) -> Arc<FieldValidators> {
    let hit = FIELD_VALIDATORS.get(ty).map(|t| Arc::clone(t.value()));
    if let Some(table) = hit {
        return table;
    }
    let validators = fields()
        .into_iter()
        .map(|(name, d)| (name.into(), compile(&d)))
        .collect::<IndexMap<String, Predicate>>();
    tracing::trace!(record = ty.name(), fields = validators.len(), "built field validators");
    let table = Arc::new(FieldValidators { record: ty.name().to_owned(), validators });
    Arc::clone(FIELD_VALIDATORS.entry(ty.clone()).or_insert(table).value())
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ScalarType;
    use serde_json::json;

    struct Node;

    static NODE: Lazy<Nominal> = Lazy::new(|| Nominal::new("Node"));

    impl Record for Node {
        fn nominal() -> Nominal {
            Nominal::clone(&NODE)
        }

        fn fields() -> Vec<(&'static str, Descriptor)> {
            vec![
                ("name", Descriptor::Scalar(ScalarType::Str)),
                ("parent", Descriptor::optional(Descriptor::Record(Self::nominal()))),
                ("children", Descriptor::list(Descriptor::Record(Self::nominal()))),
            ]
        }
    }

    #[test]
    fn table_covers_declared_fields_in_order() {
        let table = field_validators::<Node>();
        assert_eq!(table.record_name(), "Node");
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["name", "parent", "children"]);
        assert!(table.contains("parent"));
        assert!(!table.contains("extra"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn self_referencing_fields_are_nominal() {
        let table = field_validators::<Node>();
        let leaf = NODE.instance([("name", Value::str("leaf"))]);
        assert_eq!(table.check("parent", &Value::None), Some(true));
        assert_eq!(table.check("parent", &leaf), Some(true));
        assert_eq!(table.check("children", &Value::List(vec![leaf])), Some(true));
        assert_eq!(table.check("children", &Value::from(json!([{"name": "x"}]))), Some(false));
        assert_eq!(table.check("nope", &Value::None), None);
    }

    #[test]
    fn table_is_built_once_per_type() {
        let a = field_validators::<Node>();
        let b = field_validators::<Node>();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn partition_splits_invalid_and_unknown() {
        let table = field_validators::<Node>();
        let raw = Value::from(json!({"name": 3, "children": [], "colour": "red"}));
        let report = table.partition(raw.as_mapping().unwrap());
        assert_eq!(report.invalid, vec!["name".to_string()]);
        assert_eq!(report.unknown, vec!["colour".to_string()]);
        assert!(!report.is_clean());

        let ok = Value::from(json!({"name": "root", "parent": null}));
        assert!(table.partition(ok.as_mapping().unwrap()).is_clean());
    }

    #[test]
    fn non_generic_tables_use_the_given_identity() {
        let ty = Nominal::new("Ad hoc");
        let table = field_validators_for(&ty, || vec![("n".to_string(), Descriptor::Scalar(ScalarType::Int))]);
        assert_eq!(table.check("n", &Value::Int(1)), Some(true));
        let again = field_validators_for(&ty, Vec::<(String, Descriptor)>::new);
        assert_eq!(again.len(), 1);
    }
}
