//! # Images Command
//!
//! Prints the `key=value` image overrides the operator would pass to helm.

use anyhow::{Context, Result};
use platform_operator::bom::{Bom, ImageEnv};
use platform_operator::overrides::join_kvs;
use std::path::Path;

pub fn images_command(
    subcomponent: &str,
    bom_path: &Path,
    registry: Option<String>,
    image_repo: Option<String>,
    full_names: bool,
) -> Result<()> {
    let bom = Bom::load(bom_path)
        .with_context(|| format!("Failed to load BOM from {}", bom_path.display()))?;
    let env = ImageEnv {
        registry: registry.filter(|r| !r.is_empty()),
        image_repo: image_repo.filter(|r| !r.is_empty()),
        app_operator_image: None,
    };

    let images = bom
        .build_image_strings(subcomponent, &env)
        .with_context(|| format!("Failed to build image overrides for {subcomponent}"))?;

    println!("{}", join_kvs(&images.kvs));
    if full_names {
        for name in &images.full_image_names {
            println!("{name}");
        }
    }
    Ok(())
}
