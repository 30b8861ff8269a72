//! Record model
//!
//! Records are JSON objects whose key order is preserved, so column order
//! from a database or API survives every stage.

use serde_json::Value;

/// One row: column name to scalar or nested value
pub type Record = serde_json::Map<String, Value>;

/// Ordered collection of records flowing between nodes
pub type RecordSet = Vec<Record>;

/// Key used when a non-object element has to become a record
pub const SCALAR_KEY: &str = "value";

/// Turns an arbitrary JSON value into a record
///
/// Objects are taken as-is; anything else is wrapped under [`SCALAR_KEY`].
pub fn into_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => {
            let mut record = Record::new();
            record.insert(SCALAR_KEY.to_string(), other);
            record
        }
    }
}

/// Reads a possibly dotted field (`rating.rate`) from a record
pub fn lookup<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = record.get(first)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_record_wraps_scalars() {
        assert_eq!(into_record(json!({"a": 1}))["a"], json!(1));
        assert_eq!(into_record(json!(42))[SCALAR_KEY], json!(42));
    }

    #[test]
    fn test_lookup_nested_field() {
        let record = into_record(json!({ "rating": { "rate": 4.5 }, "title": "x" }));
        assert_eq!(lookup(&record, "rating.rate"), Some(&json!(4.5)));
        assert_eq!(lookup(&record, "title"), Some(&json!("x")));
        assert_eq!(lookup(&record, "title.len"), None);
        assert_eq!(lookup(&record, "missing"), None);
    }

    #[test]
    fn test_record_preserves_column_order() {
        let record = into_record(json!({ "zeta": 1, "alpha": 2, "mid": 3 }));
        let keys: Vec<_> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }
}
