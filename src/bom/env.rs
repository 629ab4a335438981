//! # Image Environment
//!
//! Registry and repository overrides that win over the values in the BOM.

/// Environment overrides applied when building image names
///
/// Read once at startup (see `ControllerConfig::image_env`) and passed explicitly, so
/// resolution never consults process-wide state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageEnv {
    /// `REGISTRY`: replaces every registry in the BOM
    pub registry: Option<String>,
    /// `IMAGE_REPO`: prefixed onto every repository in the BOM
    pub image_repo: Option<String>,
    /// `APP_OPERATOR_IMAGE`: full image for the application operator
    pub app_operator_image: Option<String>,
}

impl ImageEnv {
    /// Environment with a registry override only
    #[must_use]
    pub fn with_registry(registry: impl Into<String>) -> Self {
        Self {
            registry: Some(registry.into()),
            ..Self::default()
        }
    }

    pub(crate) fn registry(&self) -> Option<&str> {
        self.registry.as_deref().filter(|r| !r.is_empty())
    }

    pub(crate) fn image_repo(&self) -> Option<&str> {
        self.image_repo.as_deref().filter(|r| !r.is_empty())
    }
}
