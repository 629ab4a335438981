//! Prints the `Platform` CRD as YAML.

use kube::CustomResourceExt;
use platform_operator::crd::Platform;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&Platform::crd())?);
    Ok(())
}
