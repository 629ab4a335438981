//! # Key/Value Overrides
//!
//! A single helm override entry.

use serde::{Deserialize, Serialize};

/// One chart override
///
/// Accumulation order is precedence order: when the same key appears twice, the later
/// entry wins at apply time. Duplicates are kept so the full history is visible in logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Helm value path (empty for file overrides)
    pub key: String,
    /// Value, or a path when `is_file`/`set_file` is set
    pub value: String,
    /// Pass with `--set-string` so helm never coerces the type
    pub set_string: bool,
    /// Value is a path whose contents become the value (`--set-file`)
    pub set_file: bool,
    /// Value is a path to a whole values file (`-f`)
    pub is_file: bool,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Override passed with `--set-string`
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            set_string: true,
            ..Self::new(key, value)
        }
    }

    /// Values file override
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            value: path.into(),
            is_file: true,
            ..Self::default()
        }
    }

    /// Override whose value is read from a file
    pub fn set_file(key: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            set_file: true,
            ..Self::new(key, path)
        }
    }
}

/// Find the last value set for a key
pub fn find_kv<'a>(kvs: &'a [KeyValue], key: &str) -> Option<&'a str> {
    kvs.iter()
        .rev()
        .find(|kv| !kv.is_file && kv.key == key)
        .map(|kv| kv.value.as_str())
}

/// Replace every entry for a key with a single value, or append it
pub fn upsert_kv(kvs: &mut Vec<KeyValue>, kv: KeyValue) {
    if let Some(pos) = kvs.iter().position(|existing| existing.key == kv.key && !existing.is_file) {
        kvs.retain(|existing| existing.is_file || existing.key != kv.key);
        kvs.insert(pos.min(kvs.len()), kv);
    } else {
        kvs.push(kv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_kv_returns_last_write() {
        let kvs = vec![
            KeyValue::new("a", "1"),
            KeyValue::new("b", "3"),
            KeyValue::new("a", "2"),
        ];
        assert_eq!(find_kv(&kvs, "a"), Some("2"));
        assert_eq!(find_kv(&kvs, "b"), Some("3"));
        assert_eq!(find_kv(&kvs, "c"), None);
    }

    #[test]
    fn test_find_kv_ignores_files() {
        let kvs = vec![KeyValue::file("/tmp/values.yaml")];
        assert_eq!(find_kv(&kvs, ""), None);
    }

    #[test]
    fn test_upsert_kv_replaces_in_place() {
        let mut kvs = vec![
            KeyValue::new("image", "old"),
            KeyValue::new("tag", "1"),
            KeyValue::new("image", "older"),
        ];
        upsert_kv(&mut kvs, KeyValue::new("image", "new"));
        assert_eq!(
            kvs,
            vec![KeyValue::new("image", "new"), KeyValue::new("tag", "1")]
        );
    }

    #[test]
    fn test_upsert_kv_appends_missing() {
        let mut kvs = vec![KeyValue::new("tag", "1")];
        upsert_kv(&mut kvs, KeyValue::string("dns", "example.com"));
        assert_eq!(kvs.len(), 2);
        assert!(kvs[1].set_string);
    }
}
