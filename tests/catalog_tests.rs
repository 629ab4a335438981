//! # Catalog Integration Tests

mod common;

use platform_operator::bom::Bom;
use platform_operator::catalog::{check_consistency, Catalog, ConsistencyRules};
use std::path::Path;

const CATALOG: &str = "
modules:
  - name: verrazzano-application-operator
    version: ${PLATFORM_VERSION}
    chart: verrazzano-application-operator
  - name: istio
    version: 1.15.3
    chart: istio
  - name: external-dns
    version: 0.12.2
    chart: external-dns
";

fn manifest(path: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(path)
}

#[test]
fn test_sentinel_resolves_to_bom_version() {
    let bom = common::fixture_bom();
    let catalog = Catalog::from_yaml_str(CATALOG, &bom).unwrap();
    assert_eq!(catalog.get_version("verrazzano-application-operator"), "1.1.0");
    assert_eq!(catalog.get_version("istio"), "1.15.3");
    assert_eq!(catalog.get_version("unknown"), "");
}

#[test]
fn test_fixture_catalog_is_consistent() {
    let bom = common::fixture_bom();
    let catalog = Catalog::from_yaml_str(CATALOG, &bom).unwrap();
    let mismatches = check_consistency(&catalog, &bom, &ConsistencyRules::platform_defaults());
    assert!(mismatches.is_empty(), "unexpected mismatches: {mismatches:?}");
}

#[test]
fn test_drifted_module_is_reported() {
    let bom = common::fixture_bom();
    let drifted = CATALOG.replace("1.15.3", "1.16.0");
    let catalog = Catalog::from_yaml_str(&drifted, &bom).unwrap();
    let mismatches = check_consistency(&catalog, &bom, &ConsistencyRules::platform_defaults());
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].module, "istio");
    assert_eq!(mismatches[0].bom_version, Ok("1.15.3".to_string()));
}

#[test]
fn test_duplicate_module_rejected() {
    let bom = common::fixture_bom();
    let duplicated = format!("{CATALOG}  - name: istio\n    version: 1.15.3\n");
    assert!(Catalog::from_yaml_str(&duplicated, &bom).is_err());
}

#[test]
fn test_shipped_catalog_matches_shipped_bom() {
    let bom = Bom::load(manifest("manifests/platform-bom.json")).unwrap();
    let catalog = Catalog::load(manifest("manifests/catalog.yaml"), &bom).unwrap();
    assert_eq!(catalog.get_version("verrazzano-application-operator"), "1.1.0");

    let mismatches = check_consistency(&catalog, &bom, &ConsistencyRules::platform_defaults());
    assert!(mismatches.is_empty(), "unexpected mismatches: {mismatches:?}");
}
