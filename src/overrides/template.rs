//! # Value Templates
//!
//! Renders structured values blocks before they are written to an override file.
//! Templates use minijinja `{{ Name }}` syntax, and every referenced variable must
//! have a value.

use minijinja::{Environment, UndefinedBehavior};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to render values template: {0}")]
    Render(#[from] minijinja::Error),
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    // Values documents are YAML, so keep the trailing newline
    env.set_keep_trailing_newline(true);
    env
}

/// Render `template` with `vars` as the template context
pub fn render_template(
    template: &str,
    vars: &BTreeMap<&str, String>,
) -> Result<String, TemplateError> {
    Ok(environment().render_str(template, vars)?)
}
