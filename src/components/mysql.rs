//! # MySQL
//!
//! Database backing Keycloak. The database init script is generated per install and
//! handed to the chart as a `--set-file` override.

use crate::cluster::ReadinessObject;
use crate::component::{ComponentContext, ComponentError, HelmComponent, HookFuture};
use crate::overrides::{KeyValue, OverrideFiles};

pub const COMPONENT_NAME: &str = "mysql";
pub const COMPONENT_NAMESPACE: &str = "keycloak";
pub const INIT_DB_KEY: &str = "initdbScripts.create-db\\.sql";
const DATABASE_NAME: &str = "keycloak";

pub fn component() -> HelmComponent {
    HelmComponent {
        dependencies: vec![super::istio::COMPONENT_NAME.to_string()],
        ignore_namespace_override: true,
        image_pull_secret_key: Some("image.pullSecrets[0]".to_string()),
        readiness_objects: vec![ReadinessObject::stateful_set(COMPONENT_NAMESPACE, COMPONENT_NAME)],
        append_overrides_hook: Some(Box::new(append_overrides)),
        ..HelmComponent::new(COMPONENT_NAME, COMPONENT_NAME, COMPONENT_NAMESPACE)
    }
}

pub fn init_db_script(database: &str) -> String {
    format!(
        "CREATE DATABASE IF NOT EXISTS {database} DEFAULT CHARACTER SET utf8mb4;\n\
         USE {database};\n\
         GRANT CREATE, ALTER, DROP, INDEX, REFERENCES, SELECT, INSERT, UPDATE, DELETE ON {database}.* TO '{database}'@'%';\n\
         FLUSH PRIVILEGES;\n"
    )
}

fn append_overrides<'a>(
    _ctx: &'a ComponentContext,
    files: &'a OverrideFiles,
    mut kvs: Vec<KeyValue>,
) -> HookFuture<'a, Vec<KeyValue>> {
    Box::pin(async move {
        let path = files.write(&init_db_script(DATABASE_NAME)).map_err(|e| {
            ComponentError::retryable(COMPONENT_NAME, format!("failed to write init script: {e}"))
        })?;
        kvs.push(KeyValue::set_file(INIT_DB_KEY, path.to_string_lossy()));
        Ok(kvs)
    })
}
