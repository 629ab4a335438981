//! # Component Registry
//!
//! The ordered set of components the reconciler drives. Order is install order; a
//! component's dependencies are checked against a readiness snapshot taken at the
//! start of the pass.

use crate::component::{Component, ComponentError};
use crate::components::platform_components;
use crate::crd::Platform;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Readiness per component name, captured once per pass
pub type ReadinessSnapshot = BTreeMap<String, bool>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("dependency cycle found for {0}")]
    Cycle(String),
    #[error("component {component} depends on unknown component {dependency}")]
    UnknownDependency { component: String, dependency: String },
    #[error("component {component} waiting for dependencies {dependencies:?} to be ready")]
    NotReady {
        component: String,
        dependencies: Vec<String>,
    },
}

#[derive(Clone, Default)]
pub struct Registry {
    components: Vec<Arc<dyn Component>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("components", &self.names())
            .finish()
    }
}

impl Registry {
    /// Registry of every platform component
    pub fn platform_default() -> Self {
        Self::from_components(platform_components())
    }

    pub fn from_components(components: Vec<Arc<dyn Component>>) -> Self {
        Self { components }
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn Component>> {
        self.components.iter().find(|c| c.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Component>> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    /// Check that every direct dependency of `component` was ready at pass start
    ///
    /// Cycles are detected through the whole dependency graph. A dependency that is
    /// disabled is never ready, so its dependents wait.
    pub fn check_dependencies(
        &self,
        component: &dyn Component,
        ready: &ReadinessSnapshot,
    ) -> Result<(), RegistryError> {
        let mut stack = Vec::new();
        self.detect_cycle(component.name(), component.name(), &mut stack)?;

        let mut not_ready = Vec::new();
        for dependency in component.dependencies() {
            if self.find(dependency).is_none() {
                return Err(RegistryError::UnknownDependency {
                    component: component.name().to_string(),
                    dependency: dependency.clone(),
                });
            }
            if !ready.get(dependency).copied().unwrap_or(false) {
                not_ready.push(dependency.clone());
            }
        }

        if not_ready.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::NotReady {
                component: component.name().to_string(),
                dependencies: not_ready,
            })
        }
    }

    pub fn dependencies_met(&self, component: &dyn Component, ready: &ReadinessSnapshot) -> bool {
        self.check_dependencies(component, ready).is_ok()
    }

    /// Run every component's update rule; the first rejection wins
    pub fn validate_update(&self, old: &Platform, new: &Platform) -> Result<(), ComponentError> {
        self.components
            .iter()
            .try_for_each(|component| component.validate_update(old, new))
    }

    fn detect_cycle(
        &self,
        root: &str,
        name: &str,
        stack: &mut Vec<String>,
    ) -> Result<(), RegistryError> {
        if stack.iter().any(|visited| visited == name) {
            return Err(RegistryError::Cycle(root.to_string()));
        }
        let Some(component) = self.find(name) else {
            return Ok(());
        };
        stack.push(name.to_string());
        for dependency in component.dependencies() {
            self.detect_cycle(root, dependency, stack)?;
        }
        stack.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::HelmComponent;

    fn chart(name: &str, dependencies: &[&str]) -> Arc<dyn Component> {
        Arc::new(HelmComponent {
            dependencies: dependencies.iter().map(|d| (*d).to_string()).collect(),
            ..HelmComponent::new(name, name, "default")
        })
    }

    fn snapshot(entries: &[(&str, bool)]) -> ReadinessSnapshot {
        entries
            .iter()
            .map(|(name, ready)| ((*name).to_string(), *ready))
            .collect()
    }

    mod dependency_tests {
        use super::*;

        #[test]
        fn test_no_dependencies_met() {
            let registry = Registry::from_components(vec![chart("a", &[])]);
            let component = registry.find("a").unwrap();
            assert!(registry.dependencies_met(component.as_ref(), &snapshot(&[])));
        }

        #[test]
        fn test_ready_dependency_met() {
            let registry = Registry::from_components(vec![chart("a", &[]), chart("b", &["a"])]);
            let component = registry.find("b").unwrap();
            assert!(registry.dependencies_met(component.as_ref(), &snapshot(&[("a", true)])));
        }

        #[test]
        fn test_not_ready_dependency_not_met() {
            let registry = Registry::from_components(vec![chart("a", &[]), chart("b", &["a"])]);
            let component = registry.find("b").unwrap();
            assert_eq!(
                registry.check_dependencies(component.as_ref(), &snapshot(&[("a", false)])),
                Err(RegistryError::NotReady {
                    component: "b".to_string(),
                    dependencies: vec!["a".to_string()],
                })
            );
        }

        #[test]
        fn test_disabled_dependency_not_met() {
            // disabled components never appear as ready in the snapshot
            let registry = Registry::from_components(vec![chart("a", &[]), chart("b", &["a"])]);
            let component = registry.find("b").unwrap();
            assert!(!registry.dependencies_met(component.as_ref(), &snapshot(&[])));
        }

        #[test]
        fn test_unknown_dependency_not_met() {
            let registry = Registry::from_components(vec![chart("b", &["missing"])]);
            let component = registry.find("b").unwrap();
            assert!(matches!(
                registry.check_dependencies(component.as_ref(), &snapshot(&[("missing", true)])),
                Err(RegistryError::UnknownDependency { .. })
            ));
        }

        #[test]
        fn test_only_direct_dependencies_checked() {
            let registry = Registry::from_components(vec![
                chart("a", &[]),
                chart("b", &["a"]),
                chart("c", &["b"]),
            ]);
            let component = registry.find("c").unwrap();
            assert!(registry.dependencies_met(
                component.as_ref(),
                &snapshot(&[("a", false), ("b", true)])
            ));
        }
    }

    mod cycle_tests {
        use super::*;

        #[test]
        fn test_direct_cycle() {
            let registry = Registry::from_components(vec![chart("a", &["b"]), chart("b", &["a"])]);
            let component = registry.find("a").unwrap();
            let ready = snapshot(&[("a", true), ("b", true)]);
            assert_eq!(
                registry.check_dependencies(component.as_ref(), &ready),
                Err(RegistryError::Cycle("a".to_string()))
            );
        }

        #[test]
        fn test_indirect_cycle() {
            let registry = Registry::from_components(vec![
                chart("a", &["c"]),
                chart("b", &["a"]),
                chart("c", &["b"]),
            ]);
            let component = registry.find("b").unwrap();
            let ready = snapshot(&[("a", true), ("b", true), ("c", true)]);
            let err = registry
                .check_dependencies(component.as_ref(), &ready)
                .unwrap_err();
            assert_eq!(err.to_string(), "dependency cycle found for b");
        }

        #[test]
        fn test_self_cycle() {
            let registry = Registry::from_components(vec![chart("a", &["a"])]);
            let component = registry.find("a").unwrap();
            assert!(!registry.dependencies_met(component.as_ref(), &snapshot(&[("a", true)])));
        }

        #[test]
        fn test_diamond_is_not_a_cycle() {
            let registry = Registry::from_components(vec![
                chart("a", &[]),
                chart("b", &["a"]),
                chart("c", &["a"]),
                chart("d", &["b", "c"]),
            ]);
            let component = registry.find("d").unwrap();
            let ready = snapshot(&[("a", true), ("b", true), ("c", true)]);
            assert!(registry.dependencies_met(component.as_ref(), &ready));
        }
    }

    mod validate_tests {
        use super::*;

        #[test]
        fn test_platform_default_rejects_disabling_keycloak() {
            let registry = Registry::platform_default();
            let old = Platform::new("platform", Default::default());
            let new = old.with_component_enabled("keycloak", false);
            let err = registry.validate_update(&old, &new).unwrap_err();
            assert_eq!(err.to_string(), "Disabling component keycloak is not allowed");
        }

        #[test]
        fn test_platform_default_accepts_enabling() {
            let registry = Registry::platform_default();
            let old = Platform::new("platform", Default::default()).with_component_enabled("keycloak", false);
            let new = old.with_component_enabled("keycloak", true);
            assert!(registry.validate_update(&old, &new).is_ok());
        }
    }
}
