use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Error)]
#[error("at JSON path {path} → {message}")]
pub struct DecodeError {
    pub path: String,
    pub message: String,
}

impl From<serde_path_to_error::Error<serde_json::Error>> for DecodeError {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = err.path().to_string();
        DecodeError { path, message: err.into_inner().to_string() }
    }
}

/// Decode JSON text with JSON-path context in error messages.
pub fn from_str_with_path(src: &str) -> Result<Value, DecodeError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    Ok(serde_path_to_error::deserialize::<_, Value>(de)?)
}

pub fn from_slice_with_path(bytes: &[u8]) -> Result<Value, DecodeError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    Ok(serde_path_to_error::deserialize::<_, Value>(de)?)
}

/// JSON Pointer (RFC 6901) lookup over a decoded value. Mapping segments
/// match string keys; list and tuple segments must be decimal indices.
pub fn select_pointer<'a>(value: &'a Value, pointer: &str) -> Option<&'a Value> {
    if pointer.is_empty() {
        return Some(value);
    }
    let rest = pointer.strip_prefix('/')?;
    rest.split('/')
        .map(|seg| seg.replace("~1", "/").replace("~0", "~"))
        .try_fold(value, |cur, seg| match cur {
            Value::Mapping(m) => m.get(&Value::Str(seg)),
            Value::List(xs) | Value::Tuple(xs) => parse_index(&seg).and_then(|i| xs.get(i)),
            _ => None,
        })
}

fn parse_index(seg: &str) -> Option<usize> {
    // no leading zeros, no sign
    if seg.is_empty() || (seg.len() > 1 && seg.starts_with('0')) || !seg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    seg.parse().ok()
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_documents() {
        let v = from_str_with_path(r#"{"package": {"name": "x", "version": "0.1.0"}, "n": [1, 2.5]}"#).unwrap();
        let m = v.as_mapping().unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(
            select_pointer(&v, "/n/1"),
            Some(&Value::float(2.5))
        );
    }

    #[test]
    fn out_of_range_integer_reports_path() {
        let err = from_str_with_path(r#"{"a": [0, 18446744073709551615]}"#).unwrap_err();
        assert_eq!(err.path, "a[1]");
        assert!(err.message.contains("does not fit"));
    }

    #[test]
    fn syntax_errors_surface() {
        assert!(from_slice_with_path(b"{\"a\": ").is_err());
    }

    #[test]
    fn pointer_selection() {
        let v = from_str_with_path(r#"{"a/b": {"~k": [10, 20]}}"#).unwrap();
        assert_eq!(select_pointer(&v, ""), Some(&v));
        assert_eq!(select_pointer(&v, "/a~1b/~0k/0"), Some(&Value::Int(10)));
        assert_eq!(select_pointer(&v, "/a~1b/~0k/01"), None);
        assert_eq!(select_pointer(&v, "/missing"), None);
        assert_eq!(select_pointer(&v, "no-slash"), None);
    }
}
