//! # Catalog Consistency
//!
//! Cross-checks catalog module versions against the BOM. This runs in tests and from
//! `platctl catalog-check`, never from the reconciler.

use super::Catalog;
use crate::bom::Bom;
use crate::version;
use std::collections::HashMap;

/// Image standing in for a module that has no top-level BOM component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMapping {
    pub subcomponent: String,
    pub image: String,
}

impl ImageMapping {
    pub fn new(subcomponent: &str, image: &str) -> Self {
        Self {
            subcomponent: subcomponent.to_string(),
            image: image.to_string(),
        }
    }
}

/// Exceptions to the "module name == BOM component name" rule
#[derive(Debug, Clone, Default)]
pub struct ConsistencyRules {
    /// Modules with no BOM entry at all
    pub modules_not_in_bom: Vec<String>,
    /// Modules checked against an image tag; the first mapping is authoritative
    pub image_mappings: HashMap<String, Vec<ImageMapping>>,
}

impl ConsistencyRules {
    /// Exceptions for the modules the platform ships
    pub fn platform_defaults() -> Self {
        let modules_not_in_bom = [
            "verrazzano-grafana-dashboards",
            "verrazzano-network-policies",
            "cluster-issuer",
            "fluentbit-opensearch-output",
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect();

        let mut image_mappings = HashMap::new();
        image_mappings.insert(
            "fluentbit-opensearch-output".to_string(),
            vec![ImageMapping::new("fluent-operator", "fluent-bit")],
        );
        image_mappings.insert(
            "opensearch".to_string(),
            vec![ImageMapping::new("verrazzano-monitoring-operator", "opensearch")],
        );
        image_mappings.insert(
            "opensearch-dashboards".to_string(),
            vec![ImageMapping::new(
                "verrazzano-monitoring-operator",
                "opensearch-dashboards",
            )],
        );
        image_mappings.insert(
            "grafana".to_string(),
            vec![ImageMapping::new("verrazzano-monitoring-operator", "grafana")],
        );
        image_mappings.insert(
            "cluster-api".to_string(),
            vec![
                ImageMapping::new("capi-cluster-api", "cluster-api-controller"),
                ImageMapping::new("capi-oci", "cluster-api-oci-controller"),
                ImageMapping::new("capi-ocne", "cluster-api-ocne-bootstrap-controller"),
                ImageMapping::new("capi-ocne", "cluster-api-ocne-control-plane-controller"),
            ],
        );

        Self {
            modules_not_in_bom,
            image_mappings,
        }
    }
}

/// One module whose catalog version disagrees with the BOM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMismatch {
    pub module: String,
    pub catalog_version: String,
    /// BOM version, or the lookup error when the BOM has no matching entry
    pub bom_version: Result<String, String>,
}

impl std::fmt::Display for CatalogMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.bom_version {
            Ok(bom) => write!(
                f,
                "module {}: catalog version {} does not match BOM version {}",
                self.module, self.catalog_version, bom
            ),
            Err(e) => write!(f, "module {}: {}", self.module, e),
        }
    }
}

/// Compare every catalog module with the BOM, returning the mismatches
///
/// Modules mapped to an image are compared with prerelease and build parts stripped
/// from both sides, since image tags carry build suffixes the catalog does not.
pub fn check_consistency(
    catalog: &Catalog,
    bom: &Bom,
    rules: &ConsistencyRules,
) -> Vec<CatalogMismatch> {
    let mut mismatches = Vec::new();

    for module in &catalog.modules {
        if rules.modules_not_in_bom.contains(&module.name) {
            continue;
        }

        let (bom_version, module_version) = match rules
            .image_mappings
            .get(&module.name)
            .and_then(|mappings| mappings.first())
        {
            Some(mapping) => {
                let bom_version = bom
                    .find_image(&mapping.subcomponent, &mapping.image)
                    .map_err(|e| e.to_string())
                    .and_then(|image| stripped(&image.tag));
                (bom_version, stripped(&module.version))
            }
            None => (
                bom.component_version(&module.name).map_err(|e| e.to_string()),
                Ok(module.version.clone()),
            ),
        };

        let matches = match (&bom_version, &module_version) {
            (Ok(b), Ok(m)) => b == m,
            _ => false,
        };
        if !matches {
            let bom_version = match module_version {
                Err(e) => Err(e),
                Ok(_) => bom_version,
            };
            mismatches.push(CatalogMismatch {
                module: module.name.clone(),
                catalog_version: module.version.clone(),
                bom_version,
            });
        }
    }

    mismatches
}

fn stripped(input: &str) -> Result<String, String> {
    version::strip_build_and_prerelease(input).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Module;

    const BOM: &str = r#"{
        "registry": "ghcr.io",
        "version": "1.1.0",
        "components": [
            { "name": "verrazzano-application-operator", "version": "1.1.0",
              "subcomponents": [ { "name": "verrazzano-application-operator", "repository": "verrazzano", "images": [] } ] },
            { "name": "verrazzano-monitoring-operator", "version": "1.1.0",
              "subcomponents": [ { "name": "verrazzano-monitoring-operator", "repository": "verrazzano",
                "images": [ { "image": "opensearch", "tag": "2.3.0-20230525191707-4a1b2c3" } ] } ] }
        ]
    }"#;

    fn module(name: &str, version: &str) -> Module {
        Module {
            name: name.to_string(),
            version: version.to_string(),
            ..Module::default()
        }
    }

    #[test]
    fn test_matching_catalog_has_no_mismatches() {
        let bom = Bom::from_json_str(BOM).unwrap();
        let catalog = Catalog::new(
            vec![
                module("verrazzano-application-operator", "${PLATFORM_VERSION}"),
                module("opensearch", "2.3.0"),
                module("cluster-issuer", "0.0.1"),
            ],
            bom.version(),
        )
        .unwrap();
        let mismatches =
            check_consistency(&catalog, &bom, &ConsistencyRules::platform_defaults());
        assert!(mismatches.is_empty(), "unexpected mismatches: {mismatches:?}");
    }

    #[test]
    fn test_version_drift_reported() {
        let bom = Bom::from_json_str(BOM).unwrap();
        let catalog = Catalog::new(
            vec![module("verrazzano-application-operator", "1.0.9")],
            bom.version(),
        )
        .unwrap();
        let mismatches =
            check_consistency(&catalog, &bom, &ConsistencyRules::platform_defaults());
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].bom_version, Ok("1.1.0".to_string()));
        assert!(mismatches[0].to_string().contains("1.0.9"));
    }

    #[test]
    fn test_module_missing_from_bom_reported() {
        let bom = Bom::from_json_str(BOM).unwrap();
        let catalog = Catalog::new(vec![module("mystery", "1.0.0")], bom.version()).unwrap();
        let mismatches = check_consistency(&catalog, &bom, &ConsistencyRules::default());
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].bom_version.is_err());
    }
}
