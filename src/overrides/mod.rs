//! # Overrides
//!
//! Helm override construction for a component.
//!
//! Overrides are accumulated as an ordered list of [`KeyValue`] entries, later
//! entries winning, and handed to the chart backend as an [`OverridePayload`]:
//! scalars plus an ordered list of values files.

mod files;
mod kv;
mod pipeline;
mod template;
mod user;
mod wire;

pub use files::OverrideFiles;
pub use kv::{find_kv, upsert_kv, KeyValue};
pub use pipeline::{build_overrides, user_overrides};
pub use template::{render_template, TemplateError};
pub use user::flatten_values;
pub use wire::{escape_value, join_kvs, mask_sensitive};

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Overrides as applied to a release
///
/// Files are applied first, in order, and scalars on top of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverridePayload {
    /// Scalar overrides in precedence order
    pub kvs: Vec<KeyValue>,
    /// Values files, later files winning
    pub files: Vec<PathBuf>,
}

impl OverridePayload {
    /// `key=value[,key=value]` for the scalar overrides
    pub fn wire_string(&self) -> String {
        join_kvs(&self.kvs)
    }

    /// Effective value per key
    pub fn resolved(&self) -> BTreeMap<String, String> {
        self.kvs
            .iter()
            .filter(|kv| !kv.is_file)
            .map(|kv| (kv.key.clone(), kv.value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_last_write_wins() {
        let payload = OverridePayload {
            kvs: vec![
                KeyValue::new("a", "1"),
                KeyValue::new("a", "2"),
                KeyValue::new("b", "3"),
            ],
            files: Vec::new(),
        };
        let resolved = payload.resolved();
        assert_eq!(resolved.get("a").map(String::as_str), Some("2"));
        assert_eq!(resolved.get("b").map(String::as_str), Some("3"));
        assert_eq!(payload.wire_string(), "a=1,a=2,b=3");
    }
}
