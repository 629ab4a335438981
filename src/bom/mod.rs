//! # Bill of Materials
//!
//! The BOM is the immutable, versioned list of every image the platform ships, keyed
//! by component, subcomponent and image. It is loaded once and shared as `Arc<Bom>`.
//!
//! ```json
//! {
//!   "registry": "ghcr.io",
//!   "version": "1.1.0",
//!   "components": [{
//!     "name": "istio",
//!     "subcomponents": [{
//!       "name": "istiod",
//!       "repository": "verrazzano",
//!       "images": [{ "image": "pilot", "tag": "1.15.3", "helmFullImageKey": "values.pilot.image" }]
//!     }]
//!   }]
//! }
//! ```

mod env;
mod images;

pub use env::ImageEnv;
pub use images::ImageOverrides;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BomError {
    #[error("failed to read BOM file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse BOM file {path}: {message}")]
    Parse { path: String, message: String },
    #[error("duplicate subcomponent {0} in BOM")]
    DuplicateSubcomponent(String),
    #[error("duplicate image {image} in BOM subcomponent {subcomponent}")]
    DuplicateImage { subcomponent: String, image: String },
    #[error("unknown subcomponent {0}")]
    UnknownSubcomponent(String),
    #[error("unknown component {0}")]
    UnknownComponent(String),
    #[error("image {image} not found in subcomponent {subcomponent}")]
    UnknownImage { subcomponent: String, image: String },
}

/// Top-level BOM document
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BomDocument {
    /// Default registry for every image
    pub registry: String,
    /// Platform version this BOM ships
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub components: Vec<BomComponent>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BomComponent {
    pub name: String,
    /// Chart version of the component
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, alias = "subComponents")]
    pub subcomponents: Vec<BomSubComponent>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BomSubComponent {
    pub name: String,
    /// Registry override for this subcomponent
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub images: Vec<BomImage>,
}

/// One image and the helm keys its chart expects
///
/// Charts name their image values inconsistently, so each image carries the exact keys
/// to emit. A missing key means the corresponding segment is folded into the image path.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BomImage {
    #[serde(alias = "imageName")]
    pub image: String,
    #[serde(alias = "imageTag")]
    pub tag: String,
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default, alias = "helmPath")]
    pub helm_full_image_key: Option<String>,
    #[serde(default)]
    pub helm_image_key: Option<String>,
    #[serde(default, alias = "helmTagPath")]
    pub helm_tag_key: Option<String>,
    #[serde(default, alias = "helmRegPath")]
    pub helm_reg_key: Option<String>,
    #[serde(default)]
    pub helm_repo_key: Option<String>,
    #[serde(default)]
    pub helm_registry_and_repo_key: Option<String>,
}

/// Loaded BOM with a subcomponent index
#[derive(Debug, Clone)]
pub struct Bom {
    doc: BomDocument,
    // subcomponent name -> (component index, subcomponent index)
    subcomponents: HashMap<String, (usize, usize)>,
}

impl Bom {
    /// Load a BOM from a JSON or YAML file
    ///
    /// The format is chosen from the extension; anything other than `.yaml`/`.yml` is
    /// parsed as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BomError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| BomError::Read {
            path: path_str.clone(),
            source,
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let doc: BomDocument = if is_yaml {
            serde_yaml::from_str(&contents).map_err(|e| BomError::Parse {
                path: path_str.clone(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&contents).map_err(|e| BomError::Parse {
                path: path_str.clone(),
                message: e.to_string(),
            })?
        };

        tracing::debug!(
            path = %path_str,
            version = doc.version.as_str(),
            components = doc.components.len(),
            "Loaded BOM"
        );
        Self::from_document(doc)
    }

    /// Parse a BOM from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, BomError> {
        let doc: BomDocument = serde_json::from_str(json).map_err(|e| BomError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        Self::from_document(doc)
    }

    /// Index a parsed document, rejecting duplicate subcomponents or images
    pub fn from_document(doc: BomDocument) -> Result<Self, BomError> {
        let mut subcomponents = HashMap::new();
        for (ci, component) in doc.components.iter().enumerate() {
            for (si, sc) in component.subcomponents.iter().enumerate() {
                if subcomponents.insert(sc.name.clone(), (ci, si)).is_some() {
                    return Err(BomError::DuplicateSubcomponent(sc.name.clone()));
                }
                let mut seen = std::collections::HashSet::new();
                for image in &sc.images {
                    if !seen.insert(image.image.as_str()) {
                        return Err(BomError::DuplicateImage {
                            subcomponent: sc.name.clone(),
                            image: image.image.clone(),
                        });
                    }
                }
            }
        }
        Ok(Self { doc, subcomponents })
    }

    pub fn document(&self) -> &BomDocument {
        &self.doc
    }

    /// Platform version shipped by this BOM
    pub fn version(&self) -> &str {
        &self.doc.version
    }

    /// Default registry for the whole BOM
    pub fn registry(&self) -> &str {
        &self.doc.registry
    }

    pub fn components(&self) -> &[BomComponent] {
        &self.doc.components
    }

    pub fn subcomponent(&self, name: &str) -> Result<&BomSubComponent, BomError> {
        self.subcomponents
            .get(name)
            .map(|&(ci, si)| &self.doc.components[ci].subcomponents[si])
            .ok_or_else(|| BomError::UnknownSubcomponent(name.to_string()))
    }

    pub fn has_subcomponent(&self, name: &str) -> bool {
        self.subcomponents.contains_key(name)
    }

    pub fn subcomponent_image_count(&self, name: &str) -> usize {
        self.subcomponent(name).map(|sc| sc.images.len()).unwrap_or(0)
    }

    pub fn component(&self, name: &str) -> Result<&BomComponent, BomError> {
        self.doc
            .components
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| BomError::UnknownComponent(name.to_string()))
    }

    /// Declared version of a component; empty when the component has none
    pub fn component_version(&self, name: &str) -> Result<String, BomError> {
        Ok(self.component(name)?.version.clone().unwrap_or_default())
    }

    pub fn find_image(&self, subcomponent: &str, image: &str) -> Result<&BomImage, BomError> {
        self.subcomponent(subcomponent)?
            .images
            .iter()
            .find(|img| img.image == image)
            .ok_or_else(|| BomError::UnknownImage {
                subcomponent: subcomponent.to_string(),
                image: image.to_string(),
            })
    }

    /// Registry for an image: env override, then image, then subcomponent, then document
    pub fn resolve_registry(&self, sc: &BomSubComponent, image: &BomImage, env: &ImageEnv) -> String {
        if let Some(registry) = env.registry() {
            return registry.to_string();
        }
        image
            .registry
            .as_deref()
            .filter(|r| !r.is_empty())
            .or(sc.registry.as_deref().filter(|r| !r.is_empty()))
            .unwrap_or(self.doc.registry.as_str())
            .to_string()
    }

    /// Repository for an image: image beats subcomponent, `IMAGE_REPO` is prefixed
    pub fn resolve_repository(&self, sc: &BomSubComponent, image: &BomImage, env: &ImageEnv) -> String {
        let repo = image
            .repository
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(sc.repository.as_str());
        match env.image_repo() {
            Some(user_repo) if repo.is_empty() => user_repo.to_string(),
            Some(user_repo) => format!("{user_repo}/{repo}"),
            None => repo.to_string(),
        }
    }
}
