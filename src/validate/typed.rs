use indexmap::IndexMap;

use crate::descriptor::TypedRecord;
use crate::value::Value;

use super::{compile, Predicate};

/// Keyed-record check. Required keys must be present whatever `total` says;
/// `total` only decides whether undeclared keys are rejected.
pub(super) fn record_validator(rec: &TypedRecord) -> Predicate {
    let required: Vec<Value> = rec.required_names().map(Value::str).collect();
    let fields: IndexMap<Value, Predicate> = rec
        .fields
        .iter()
        .map(|f| (Value::str(f.name.as_str()), compile(&f.descriptor)))
        .collect();

    if rec.total {
        Predicate::new(move |v| {
            let Value::Mapping(m) = v else { return false };
            required.iter().all(|k| m.contains_key(k))
                && m.iter().all(|(k, x)| fields.get(k).is_some_and(|p| p.check(x)))
        })
    } else {
        Predicate::new(move |v| {
            let Value::Mapping(m) = v else { return false };
            required.iter().all(|k| m.contains_key(k))
                && m.iter().all(|(k, x)| fields.get(k).is_none_or(|p| p.check(x)))
        })
    }
}
