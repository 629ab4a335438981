//! Platform Operator Library
//!
//! Installs, upgrades and uninstalls the components of a platform from a Bill of
//! Materials, driven by a single `Platform` custom resource.
//!
//! ## Quick Start
//!
//! ```rust
//! use platform_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod bom;
pub mod catalog;
pub mod cluster;
pub mod component;
pub mod components;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod helm;
pub mod observability;
pub mod overrides;
pub mod prelude;
pub mod registry;
pub mod runtime;
pub mod version;
