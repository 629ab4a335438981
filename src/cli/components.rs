//! # Components Command

use platform_operator::registry::Registry;

/// Print the registry in install order with each component's dependencies
pub fn components_command() {
    let registry = Registry::platform_default();

    println!("{:<4} {:<36} {:<12} DEPENDENCIES", "#", "NAME", "MIN VERSION");
    println!("{}", "-".repeat(80));
    for (index, component) in registry.iter().enumerate() {
        let min_version = match component.min_platform_version() {
            "" => "-",
            v => v,
        };
        let dependencies = if component.dependencies().is_empty() {
            "-".to_string()
        } else {
            component.dependencies().join(", ")
        };
        println!(
            "{:<4} {:<36} {:<12} {}",
            index + 1,
            component.name(),
            min_version,
            dependencies
        );
    }
}
