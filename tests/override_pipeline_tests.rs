//! # Override Pipeline Integration Tests

mod common;

use platform_operator::component::{ComponentContext, HelmComponent, HookFuture};
use platform_operator::crd::{ComponentSpec, Override, PlatformSpec, ValueRef};
use platform_operator::overrides::{build_overrides, KeyValue, OverrideFiles};
use std::collections::BTreeMap;

fn append_a2_b3<'a>(
    _ctx: &'a ComponentContext,
    _files: &'a OverrideFiles,
    mut kvs: Vec<KeyValue>,
) -> HookFuture<'a, Vec<KeyValue>> {
    Box::pin(async move {
        kvs.push(KeyValue::new("a", "2"));
        kvs.push(KeyValue::new("b", "3"));
        Ok(kvs)
    })
}

fn append_values_file<'a>(
    _ctx: &'a ComponentContext,
    files: &'a OverrideFiles,
    mut kvs: Vec<KeyValue>,
) -> HookFuture<'a, Vec<KeyValue>> {
    Box::pin(async move {
        let path = files.write("replicas: 3\n").map_err(|e| {
            platform_operator::component::ComponentError::retryable("precedence", e.to_string())
        })?;
        kvs.push(KeyValue::file(path.display().to_string()));
        Ok(kvs)
    })
}

fn precedence_component() -> HelmComponent {
    HelmComponent {
        append_overrides_hook: Some(Box::new(append_a2_b3)),
        ..HelmComponent::new("precedence", "precedence", "test")
    }
}

#[tokio::test]
async fn test_later_steps_win() {
    let tmp = tempfile::tempdir().unwrap();
    let (charts, cluster) = (common::FakeCharts::new(), common::FakeCluster::new());
    let platform = common::platform(PlatformSpec::default());
    let ctx = common::context(&platform, &charts, &cluster, tmp.path());
    let component = precedence_component();
    let files = component.override_files(&ctx);

    let payload = build_overrides(&component, &ctx, &files, vec![KeyValue::new("b", "4")])
        .await
        .unwrap();

    let resolved = payload.resolved();
    assert_eq!(resolved.get("a").map(String::as_str), Some("2"));
    assert_eq!(resolved.get("b").map(String::as_str), Some("4"));
    assert_eq!(resolved.len(), 2);
    // BOM image first, then the hook, then the caller
    assert_eq!(
        payload.wire_string(),
        "a=ghcr.io/test/precedence:0.1.0,a=2,b=3,b=4"
    );
}

#[tokio::test]
async fn test_pull_secret_key_follows_hook_and_precedes_caller() {
    let tmp = tempfile::tempdir().unwrap();
    let (charts, cluster) = (common::FakeCharts::new(), common::FakeCluster::new());
    cluster.set_pull_secret(true);
    let platform = common::platform(PlatformSpec::default());
    let ctx = common::context(&platform, &charts, &cluster, tmp.path());
    let component = HelmComponent {
        image_pull_secret_key: Some("global.imagePullSecrets[0]".to_string()),
        ..precedence_component()
    };
    let files = component.override_files(&ctx);

    let payload = build_overrides(&component, &ctx, &files, vec![KeyValue::new("b", "4")])
        .await
        .unwrap();

    assert_eq!(
        payload.wire_string(),
        "a=ghcr.io/test/precedence:0.1.0,a=2,b=3,\
         global.imagePullSecrets[0]=verrazzano-container-registry,b=4"
    );
    assert_eq!(
        cluster.copied_secrets(),
        vec!["default/verrazzano-container-registry->test".to_string()]
    );
}

#[tokio::test]
async fn test_missing_pull_secret_adds_no_key() {
    let tmp = tempfile::tempdir().unwrap();
    let (charts, cluster) = (common::FakeCharts::new(), common::FakeCluster::new());
    let platform = common::platform(PlatformSpec::default());
    let ctx = common::context(&platform, &charts, &cluster, tmp.path());
    let component = HelmComponent {
        image_pull_secret_key: Some("global.imagePullSecrets[0]".to_string()),
        ..precedence_component()
    };
    let files = component.override_files(&ctx);

    let payload = build_overrides(&component, &ctx, &files, Vec::new()).await.unwrap();

    assert!(!payload.resolved().contains_key("global.imagePullSecrets[0]"));
    assert!(cluster.copied_secrets().is_empty());
}

#[tokio::test]
async fn test_user_overrides_follow_hook_overrides() {
    let tmp = tempfile::tempdir().unwrap();
    let (charts, cluster) = (common::FakeCharts::new(), common::FakeCluster::new());
    cluster.add_config_map("precedence-values", "values.yaml", "b: 5\nnested:\n  c: x\n");

    let spec = PlatformSpec {
        components: BTreeMap::from([(
            "precedence".to_string(),
            ComponentSpec {
                enabled: None,
                overrides: vec![
                    Override {
                        values: Some(serde_json::json!({ "a": 9 })),
                        ..Override::default()
                    },
                    Override {
                        config_map_ref: Some(ValueRef {
                            name: "precedence-values".to_string(),
                            key: "values.yaml".to_string(),
                            optional: false,
                        }),
                        ..Override::default()
                    },
                    Override {
                        secret_ref: Some(ValueRef {
                            name: "missing".to_string(),
                            key: "values.yaml".to_string(),
                            optional: true,
                        }),
                        ..Override::default()
                    },
                ],
            },
        )]),
        ..PlatformSpec::default()
    };
    let platform = common::platform(spec);
    let ctx = common::context(&platform, &charts, &cluster, tmp.path());
    let component = precedence_component();
    let files = component.override_files(&ctx);

    let payload = build_overrides(&component, &ctx, &files, Vec::new())
        .await
        .unwrap();
    let resolved = payload.resolved();
    assert_eq!(resolved.get("a").map(String::as_str), Some("9"));
    assert_eq!(resolved.get("b").map(String::as_str), Some("5"));
    assert_eq!(resolved.get("nested.c").map(String::as_str), Some("x"));
}

#[tokio::test]
async fn test_missing_required_reference_is_retryable() {
    let tmp = tempfile::tempdir().unwrap();
    let (charts, cluster) = (common::FakeCharts::new(), common::FakeCluster::new());
    let spec = PlatformSpec {
        components: BTreeMap::from([(
            "precedence".to_string(),
            ComponentSpec {
                enabled: None,
                overrides: vec![Override {
                    config_map_ref: Some(ValueRef {
                        name: "absent".to_string(),
                        key: "values.yaml".to_string(),
                        optional: false,
                    }),
                    ..Override::default()
                }],
            },
        )]),
        ..PlatformSpec::default()
    };
    let platform = common::platform(spec);
    let ctx = common::context(&platform, &charts, &cluster, tmp.path());
    let component = precedence_component();
    let files = component.override_files(&ctx);

    let error = build_overrides(&component, &ctx, &files, Vec::new())
        .await
        .unwrap_err();
    assert!(error.is_retryable());
}

#[tokio::test]
async fn test_hook_files_become_file_overrides() {
    let tmp = tempfile::tempdir().unwrap();
    let (charts, cluster) = (common::FakeCharts::new(), common::FakeCluster::new());
    let platform = common::platform(PlatformSpec::default());
    let ctx = common::context(&platform, &charts, &cluster, tmp.path());
    let component = HelmComponent {
        append_overrides_hook: Some(Box::new(append_values_file)),
        ignore_image_overrides: true,
        ..HelmComponent::new("precedence", "precedence", "test")
    };
    let files = component.override_files(&ctx);

    let payload = build_overrides(&component, &ctx, &files, Vec::new())
        .await
        .unwrap();
    assert!(payload.kvs.is_empty());
    assert_eq!(payload.files.len(), 1);
    assert_eq!(std::fs::read_to_string(&payload.files[0]).unwrap(), "replicas: 3\n");

    assert_eq!(files.cleanup(), 1);
    assert!(!payload.files[0].exists());
}
