//! # Component Lifecycle Integration Tests
//!
//! The helm component base driven against in-memory backends.

mod common;

use platform_operator::bom::ImageEnv;
use platform_operator::component::HelmComponent;
use platform_operator::components::app_operator::app_operator_image_overrides;
use platform_operator::crd::{LogLevel, LoggingConfig, PlatformSpec};
use platform_operator::helm::ReleaseStatus;
use platform_operator::registry::Registry;

fn chart(name: &str) -> HelmComponent {
    HelmComponent::new(name, name, "test")
}

mod install_tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_release_is_uninstalled_before_retry() {
        let tmp = tempfile::tempdir().unwrap();
        let (charts, cluster) = (common::FakeCharts::new(), common::FakeCluster::new());
        charts.set_status("keycloak", ReleaseStatus::Failed);
        let platform = common::platform(PlatformSpec::default());
        let ctx = common::context(&platform, &charts, &cluster, tmp.path());
        let component = chart("keycloak");

        component.pre_install(&ctx).await.unwrap();
        component.install(&ctx).await.unwrap();

        assert_eq!(
            charts.calls(),
            vec!["uninstall:keycloak".to_string(), "upgrade_install:keycloak".to_string()]
        );
        assert_eq!(charts.status("keycloak"), ReleaseStatus::Deployed);
        assert_eq!(cluster.namespaces(), vec!["test".to_string()]);
    }

    #[tokio::test]
    async fn test_deployed_release_is_not_reset() {
        let tmp = tempfile::tempdir().unwrap();
        let (charts, cluster) = (common::FakeCharts::new(), common::FakeCluster::new());
        charts.set_status("keycloak", ReleaseStatus::Deployed);
        let platform = common::platform(PlatformSpec::default());
        let ctx = common::context(&platform, &charts, &cluster, tmp.path());

        chart("keycloak").pre_install(&ctx).await.unwrap();
        assert!(charts.calls().is_empty());
    }

    #[tokio::test]
    async fn test_install_request_targets_release() {
        let tmp = tempfile::tempdir().unwrap();
        let (charts, cluster) = (common::FakeCharts::new(), common::FakeCluster::new());
        let platform = common::platform(PlatformSpec::default());
        let ctx = common::context(&platform, &charts, &cluster, tmp.path());

        chart("external-dns").install(&ctx).await.unwrap();

        let requests = charts.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].release_name, "external-dns");
        assert_eq!(requests[0].namespace, "test");
        assert_eq!(requests[0].chart_dir, tmp.path().join("charts").join("external-dns"));
        let resolved = requests[0].overrides.resolved();
        assert_eq!(resolved.get("image.tag").map(String::as_str), Some("0.12.2"));
    }

    #[tokio::test]
    async fn test_platform_log_levels_reach_the_chart_request() {
        let tmp = tempfile::tempdir().unwrap();
        let (charts, cluster) = (common::FakeCharts::new(), common::FakeCluster::new());
        let platform = common::platform(PlatformSpec {
            logging: Some(LoggingConfig {
                helm: LogLevel::Debug,
                components: LogLevel::Warn,
                ..LoggingConfig::default()
            }),
            ..PlatformSpec::default()
        });
        let ctx = common::context(&platform, &charts, &cluster, tmp.path());
        assert!(!ctx.logs_lifecycle());

        chart("dex").install(&ctx).await.unwrap();
        assert_eq!(charts.requests()[0].log_level, LogLevel::Debug);

        let quiet = common::platform(PlatformSpec::default());
        let ctx = common::context(&quiet, &charts, &cluster, tmp.path());
        assert!(ctx.logs_lifecycle());
    }

    #[tokio::test]
    async fn test_readiness_follows_workloads() {
        let tmp = tempfile::tempdir().unwrap();
        let (charts, cluster) = (common::FakeCharts::new(), common::FakeCluster::new());
        let platform = common::platform(PlatformSpec::default());
        let ctx = common::context(&platform, &charts, &cluster, tmp.path());
        let component = HelmComponent {
            readiness_objects: vec![platform_operator::cluster::ReadinessObject::deployment(
                "test", "mysql",
            )],
            ..chart("mysql")
        };

        assert!(!component.is_ready(&ctx).await.unwrap());
        charts.set_status("mysql", ReleaseStatus::Deployed);
        cluster.set_not_ready("mysql");
        assert!(!component.is_ready(&ctx).await.unwrap());
        cluster.set_ready("mysql");
        assert!(component.is_ready(&ctx).await.unwrap());
    }
}

mod upgrade_tests {
    use super::*;

    #[tokio::test]
    async fn test_upgrade_reuses_current_values() {
        let tmp = tempfile::tempdir().unwrap();
        let (charts, cluster) = (common::FakeCharts::new(), common::FakeCluster::new());
        charts.set_status("dex", ReleaseStatus::Deployed);
        let platform = common::platform(PlatformSpec::default());
        let ctx = common::context(&platform, &charts, &cluster, tmp.path());

        chart("dex").upgrade(&ctx).await.unwrap();

        assert_eq!(
            charts.calls(),
            vec!["get_values:dex".to_string(), "upgrade_install:dex".to_string()]
        );
        let requests = charts.requests();
        assert!(requests[0].wait);
        assert_eq!(requests[0].overrides.files.len(), 1);
    }

    #[tokio::test]
    async fn test_upgrade_skipped_when_not_installed() {
        let tmp = tempfile::tempdir().unwrap();
        let (charts, cluster) = (common::FakeCharts::new(), common::FakeCluster::new());
        let platform = common::platform(PlatformSpec::default());
        let ctx = common::context(&platform, &charts, &cluster, tmp.path());

        chart("dex").upgrade(&ctx).await.unwrap();
        assert!(charts.calls().is_empty());
    }
}

mod validate_update_tests {
    use super::*;

    #[test]
    fn test_disabling_enabled_component_rejected() {
        let component = chart("keycloak");
        let enabled = common::platform(PlatformSpec::default());
        let disabled = enabled.with_component_enabled("keycloak", false);

        let error = component.validate_update(&enabled, &disabled).unwrap_err();
        assert_eq!(error.to_string(), "Disabling component keycloak is not allowed");
    }

    #[test]
    fn test_enabling_disabled_component_accepted() {
        let component = chart("keycloak");
        let disabled =
            common::platform(PlatformSpec::default()).with_component_enabled("keycloak", false);
        let enabled = disabled.with_component_enabled("keycloak", true);

        assert!(component.validate_update(&disabled, &enabled).is_ok());
    }

    #[test]
    fn test_allow_disable_accepts_disabling() {
        let component = HelmComponent {
            allow_disable: true,
            ..chart("jaeger-operator")
        };
        let enabled = common::platform(PlatformSpec::default());
        let disabled = enabled.with_component_enabled("jaeger-operator", false);
        assert!(component.validate_update(&enabled, &disabled).is_ok());
    }

    #[test]
    fn test_registry_validates_every_component() {
        let registry = Registry::platform_default();
        let enabled = common::platform(PlatformSpec::default());
        let disabled = enabled.with_component_enabled("keycloak", false);

        assert!(registry.validate_update(&enabled, &disabled).is_err());
        assert!(registry.validate_update(&disabled, &enabled).is_ok());
    }
}

mod env_image_tests {
    use super::*;

    #[test]
    fn test_app_operator_image_yields_one_entry() {
        let env = ImageEnv {
            app_operator_image: Some("myreg.io/app-operator:dev".to_string()),
            ..ImageEnv::default()
        };
        let kvs = app_operator_image_overrides(&env);
        assert_eq!(kvs.len(), 1);
        assert_eq!(kvs[0].key, "image");
        assert_eq!(kvs[0].value, "myreg.io/app-operator:dev");
    }

    #[test]
    fn test_unset_app_operator_image_yields_nothing() {
        assert!(app_operator_image_overrides(&ImageEnv::default()).is_empty());
        let empty = ImageEnv {
            app_operator_image: Some(String::new()),
            ..ImageEnv::default()
        };
        assert!(app_operator_image_overrides(&empty).is_empty());
    }
}
