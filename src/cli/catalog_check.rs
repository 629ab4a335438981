//! # Catalog Check Command
//!
//! Compares the version catalog with the BOM and fails on any mismatch.

use anyhow::{Context, Result};
use platform_operator::bom::Bom;
use platform_operator::catalog::{check_consistency, Catalog, ConsistencyRules};
use std::path::Path;

pub fn catalog_check_command(bom_path: &Path, catalog_path: &Path) -> Result<()> {
    let bom = Bom::load(bom_path)
        .with_context(|| format!("Failed to load BOM from {}", bom_path.display()))?;
    let catalog = Catalog::load(catalog_path, &bom)
        .with_context(|| format!("Failed to load catalog from {}", catalog_path.display()))?;

    println!(
        "🔍 Checking {} catalog modules against BOM {}",
        catalog.modules.len(),
        bom.version()
    );

    let mismatches = check_consistency(&catalog, &bom, &ConsistencyRules::platform_defaults());
    if mismatches.is_empty() {
        println!("✅ Catalog is consistent with the BOM");
        return Ok(());
    }

    for mismatch in &mismatches {
        println!("   ❌ {mismatch}");
    }
    Err(anyhow::anyhow!(
        "{} catalog module(s) do not match the BOM",
        mismatches.len()
    ))
}
