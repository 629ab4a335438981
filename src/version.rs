//! # Semantic Versions
//!
//! Version parsing for platform version gates and catalog checks, on top of
//! [`semver::Version`]. An optional leading `v` is accepted.

use semver::{BuildMetadata, Prerelease, Version};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("invalid semantic version {input}: {source}")]
    Invalid {
        input: String,
        #[source]
        source: semver::Error,
    },
}

/// Parse `input`, tolerating surrounding whitespace and a leading `v`
pub fn parse(input: &str) -> Result<Version, VersionError> {
    let trimmed = input.trim();
    let bare = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
    Version::parse(bare).map_err(|source| VersionError::Invalid {
        input: input.to_string(),
        source,
    })
}

/// `major.minor.patch` with prerelease and build cleared
pub fn core(version: &Version) -> Version {
    Version {
        pre: Prerelease::EMPTY,
        build: BuildMetadata::EMPTY,
        ..version.clone()
    }
}

/// Parse `input` and render it without prerelease and build parts
pub fn strip_build_and_prerelease(input: &str) -> Result<String, VersionError> {
    parse(input).map(|v| core(&v).to_string())
}

/// True when `actual` satisfies the minimum `required` version
///
/// An empty `actual` means the platform version is not yet known and is accepted.
/// Build metadata never affects the result; a prerelease sorts below its release.
/// Unparseable versions fail the gate.
pub fn meets_minimum(required: &str, actual: &str) -> bool {
    if actual.is_empty() {
        return true;
    }
    match (parse(required), parse(actual)) {
        (Ok(mut required), Ok(mut actual)) => {
            required.build = BuildMetadata::EMPTY;
            actual.build = BuildMetadata::EMPTY;
            actual >= required
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!("Failed comparing platform versions: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_version() {
        let v = parse("v1.5.2-rc.1+build.7").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 5, 2));
        assert_eq!(v.pre.as_str(), "rc.1");
        assert_eq!(v.build.as_str(), "build.7");
        assert_eq!(core(&v).to_string(), "1.5.2");
        assert_eq!(strip_build_and_prerelease(" 1.1.0-beta+x ").unwrap(), "1.1.0");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse("1.5").is_err());
        assert!(parse("latest").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_meets_minimum() {
        assert!(meets_minimum("1.0.0", ""));
        assert!(meets_minimum("1.0.0", "1.0.0"));
        assert!(meets_minimum("1.3.0", "1.4.1"));
        assert!(meets_minimum("1.3.0", "v1.3.0"));
        assert!(!meets_minimum("1.5.0", "1.4.1"));
        assert!(!meets_minimum("1.0.0", "garbage"));
    }

    #[test]
    fn test_prerelease_and_build_in_gate() {
        assert!(!meets_minimum("1.1.0", "1.1.0-rc.1"));
        assert!(meets_minimum("1.1.0-rc.1", "1.1.0-rc.2"));
        assert!(!meets_minimum("1.1.0-rc.10", "1.1.0-rc.2"));
        assert!(meets_minimum("1.1.0+b", "1.1.0+a"));
    }
}
