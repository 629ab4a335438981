//! # Module Catalog
//!
//! Component → version map for the module packages the platform distributes.
//!
//! ```yaml
//! modules:
//!   - name: verrazzano-application-operator
//!     version: ${PLATFORM_VERSION}
//!     chart: verrazzano-application-operator
//!     valuesFiles:
//!       - values.yaml
//! ```
//!
//! A version equal to [`BOM_VERSION_SENTINEL`](crate::constants::BOM_VERSION_SENTINEL)
//! is replaced with the BOM platform version when the catalog is loaded.

mod consistency;

pub use consistency::{check_consistency, CatalogMismatch, ConsistencyRules, ImageMapping};

use crate::bom::Bom;
use crate::constants::BOM_VERSION_SENTINEL;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("duplicate module {0} in catalog")]
    DuplicateModule(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub chart: String,
    #[serde(default)]
    pub values_files: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct CatalogDocument {
    #[serde(default)]
    modules: Vec<Module>,
}

/// Loaded catalog with every version resolved
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub modules: Vec<Module>,
    version_map: HashMap<String, String>,
}

impl Catalog {
    /// Load a catalog file and resolve sentinel versions against the BOM
    pub fn load(path: impl AsRef<Path>, bom: &Bom) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_yaml_str(&contents, bom).map_err(|e| match e {
            CatalogError::Parse { source, .. } => CatalogError::Parse {
                path: display,
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml_str(yaml: &str, bom: &Bom) -> Result<Self, CatalogError> {
        let doc: CatalogDocument =
            serde_yaml::from_str(yaml).map_err(|source| CatalogError::Parse {
                path: "<inline>".to_string(),
                source,
            })?;
        Self::new(doc.modules, bom.version())
    }

    /// Build a catalog from modules, resolving the sentinel to `platform_version`
    pub fn new(modules: Vec<Module>, platform_version: &str) -> Result<Self, CatalogError> {
        let mut resolved = Vec::with_capacity(modules.len());
        let mut version_map = HashMap::new();
        for mut module in modules {
            if module.version == BOM_VERSION_SENTINEL {
                module.version = platform_version.to_string();
            }
            if version_map
                .insert(module.name.clone(), module.version.clone())
                .is_some()
            {
                return Err(CatalogError::DuplicateModule(module.name));
            }
            resolved.push(module);
        }
        Ok(Self {
            modules: resolved,
            version_map,
        })
    }

    /// Resolved version of a module, or an empty string when the module is unknown
    pub fn get_version(&self, name: &str) -> String {
        self.version_map.get(name).cloned().unwrap_or_default()
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }
}
