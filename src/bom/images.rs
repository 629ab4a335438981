//! # Image Overrides
//!
//! Turns the images of a BOM subcomponent into helm overrides.

use super::{Bom, BomError, ImageEnv};
use crate::overrides::KeyValue;

const DEFAULT_IMAGE_KEY: &str = "image";

/// Overrides and fully qualified names for every image of one subcomponent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOverrides {
    pub kvs: Vec<KeyValue>,
    /// `registry/repository/image:tag` for each image, in BOM order
    pub full_image_names: Vec<String>,
}

impl Bom {
    /// Build the helm overrides for every image of a subcomponent
    ///
    /// Each image segment (registry, repository, name, tag) is either emitted under the
    /// helm key the BOM names for it, or folded into a partial image path. The partial
    /// path is emitted under `helmFullImageKey`, or under `image` when the subcomponent
    /// has produced no keys so far.
    pub fn build_image_strings(
        &self,
        subcomponent: &str,
        env: &ImageEnv,
    ) -> Result<ImageOverrides, BomError> {
        let sc = self.subcomponent(subcomponent)?;
        let mut result = ImageOverrides::default();

        for image in &sc.images {
            let registry = self.resolve_registry(sc, image, env);
            let repo = self.resolve_repository(sc, image, env);
            let mut kvs = Vec::new();
            let mut partial = String::new();

            match non_empty(&image.helm_reg_key) {
                Some(key) => kvs.push(KeyValue::new(key, registry.as_str())),
                None => {
                    partial.push_str(&registry);
                    partial.push('/');
                }
            }

            match non_empty(&image.helm_repo_key) {
                Some(key) => kvs.push(KeyValue::new(key, repo.as_str())),
                None if !repo.is_empty() => {
                    partial.push_str(&repo);
                    partial.push('/');
                }
                None => {}
            }

            if let Some(key) = non_empty(&image.helm_registry_and_repo_key) {
                kvs.push(KeyValue::new(key, format!("{registry}/{repo}")));
            }

            match non_empty(&image.helm_image_key) {
                Some(key) => kvs.push(KeyValue::new(key, image.image.as_str())),
                None => partial.push_str(&image.image),
            }

            match non_empty(&image.helm_tag_key) {
                Some(key) => kvs.push(KeyValue::new(key, image.tag.as_str())),
                None => {
                    partial.push(':');
                    partial.push_str(&image.tag);
                }
            }

            if let Some(key) = non_empty(&image.helm_full_image_key) {
                kvs.push(KeyValue::new(key, partial.as_str()));
            }

            if kvs.is_empty() && result.kvs.is_empty() {
                kvs.push(KeyValue::new(DEFAULT_IMAGE_KEY, partial.as_str()));
            }

            result.kvs.extend(kvs);
            result.full_image_names.push(full_image_name(&registry, &repo, &image.image, &image.tag));
        }

        Ok(result)
    }

    /// Helm overrides for every image of a subcomponent
    pub fn build_image_overrides(
        &self,
        subcomponent: &str,
        env: &ImageEnv,
    ) -> Result<Vec<KeyValue>, BomError> {
        Ok(self.build_image_strings(subcomponent, env)?.kvs)
    }
}

fn non_empty(key: &Option<String>) -> Option<&str> {
    key.as_deref().filter(|k| !k.is_empty())
}

fn full_image_name(registry: &str, repo: &str, image: &str, tag: &str) -> String {
    if repo.is_empty() {
        format!("{registry}/{image}:{tag}")
    } else {
        format!("{registry}/{repo}/{image}:{tag}")
    }
}
