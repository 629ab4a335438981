//! # User Overrides
//!
//! Flattens the structured values a user supplies on the platform resource into
//! dotted helm keys.

use super::KeyValue;
use serde_json::Value;

/// Flatten a values document into ordered overrides
///
/// Objects nest with `.`, arrays index with `[i]`, and dots inside a key are escaped
/// so helm does not split on them. Strings are passed with `--set-string`; numbers and
/// booleans keep their type. Empty objects and arrays produce nothing.
pub fn flatten_values(values: &Value) -> Vec<KeyValue> {
    let mut kvs = Vec::new();
    flatten_into(values, "", &mut kvs);
    kvs
}

fn flatten_into(value: &Value, prefix: &str, kvs: &mut Vec<KeyValue>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let escaped = key.replace('.', "\\.");
                let path = if prefix.is_empty() {
                    escaped
                } else {
                    format!("{prefix}.{escaped}")
                };
                flatten_into(child, &path, kvs);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(child, &format!("{prefix}[{i}]"), kvs);
            }
        }
        Value::String(s) if !prefix.is_empty() => kvs.push(KeyValue::string(prefix, s.as_str())),
        Value::Null => {}
        other if !prefix.is_empty() => kvs.push(KeyValue::new(prefix, other.to_string())),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_objects_and_arrays() {
        let kvs = flatten_values(&json!({
            "controller": { "replicas": 2, "metrics": { "enabled": true } },
            "hosts": ["a.io", "b.io"],
        }));
        assert_eq!(
            kvs,
            vec![
                KeyValue::new("controller.metrics.enabled", "true"),
                KeyValue::new("controller.replicas", "2"),
                KeyValue::string("hosts[0]", "a.io"),
                KeyValue::string("hosts[1]", "b.io"),
            ]
        );
    }

    #[test]
    fn test_dotted_keys_escaped() {
        let kvs = flatten_values(&json!({ "annotations": { "example.io/owner": "team" } }));
        assert_eq!(kvs, vec![KeyValue::string(r"annotations.example\.io/owner", "team")]);
    }

    #[test]
    fn test_scalar_root_ignored() {
        assert!(flatten_values(&json!("loose")).is_empty());
        assert!(flatten_values(&json!(null)).is_empty());
    }
}
