//! # Wire Format
//!
//! Inline `key=value[,key=value]` rendering of scalar overrides, and masking of
//! sensitive values before anything reaches a log line.

use super::KeyValue;
use regex::Regex;
use std::sync::LazyLock;

const MASK: &str = "*****";

static PASSWORD: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"[Pp]assword=(.+?)(?:,|\z)"));

/// Escape the characters the inline format uses as separators
pub fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace(',', "\\,")
}

/// Join scalar overrides into the inline form
///
/// File overrides are skipped. Order is preserved so the last entry for a key wins.
pub fn join_kvs(kvs: &[KeyValue]) -> String {
    kvs.iter()
        .filter(|kv| !kv.is_file)
        .map(|kv| format!("{}={}", kv.key, escape_value(&kv.value)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Replace every password value in a command line or override string
pub fn mask_sensitive(input: &str) -> String {
    let Ok(regex) = PASSWORD.as_ref() else {
        return input.to_string();
    };
    regex
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let whole = &caps[0];
            match caps.get(1) {
                Some(value) => whole.replacen(value.as_str(), MASK, 1),
                None => whole.to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_preserves_order_and_skips_files() {
        let kvs = vec![
            KeyValue::new("a", "1"),
            KeyValue::file("/tmp/x.yaml"),
            KeyValue::new("a", "2"),
            KeyValue::string("b", "three"),
        ];
        assert_eq!(join_kvs(&kvs), "a=1,a=2,b=three");
    }

    #[test]
    fn test_commas_in_values_are_escaped() {
        let kvs = vec![KeyValue::new("hosts", "a.io,b.io")];
        assert_eq!(join_kvs(&kvs), r"hosts=a.io\,b.io");
    }

    #[test]
    fn test_mask_sensitive() {
        let masked = mask_sensitive("helm upgrade --set auth.rootPassword=s3cret,auth.user=admin");
        assert_eq!(masked, "helm upgrade --set auth.rootPassword=*****,auth.user=admin");

        let trailing = mask_sensitive("--set adminPassword=hunter2");
        assert_eq!(trailing, "--set adminPassword=*****");
    }

    #[test]
    fn test_mask_leaves_other_values() {
        assert_eq!(mask_sensitive("image.tag=1.2.3"), "image.tag=1.2.3");
    }
}
