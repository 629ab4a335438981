//! # Override Files
//!
//! Temp values files written for one release. Files share a per-release prefix so a
//! cleanup pass also removes files left behind by a crashed run.

use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Writer and janitor for the temp values files of one release
#[derive(Debug, Clone)]
pub struct OverrideFiles {
    dir: PathBuf,
    prefix: String,
}

impl OverrideFiles {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Files named `<release>-overrides-*.yaml`
    pub fn for_release(dir: impl Into<PathBuf>, release: &str) -> Self {
        Self::new(dir, format!("{release}-overrides-"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Write `contents` to a new uniquely named file and return its path
    pub fn write(&self, contents: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let mut file = tempfile::Builder::new()
            .prefix(&self.prefix)
            .suffix(".yaml")
            .tempfile_in(&self.dir)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        debug!("Wrote override file {}", path.display());
        Ok(path)
    }

    /// Remove every file matching the prefix, returning how many were removed
    pub fn cleanup(&self) -> usize {
        let pattern = format!(r"^{}.*\.yaml$", regex::escape(&self.prefix));
        let Ok(regex) = Regex::new(&pattern) else {
            warn!("Invalid override file pattern {}", pattern);
            return 0;
        };

        let mut removed = 0;
        for entry in WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let name = entry.file_name().to_string_lossy();
            if !regex.is_match(&name) {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!(
                    "Failed to remove override file {}: {}",
                    entry.path().display(),
                    e
                ),
            }
        }
        removed
    }
}
