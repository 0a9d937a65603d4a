//! # Core Configuration Module
//!
//! Builder-based configuration for the music switcher core.
//!
//! ## Required Dependencies
//!
//! - `SettingsStore` - where the user's provider choice, redirect toggles and
//!   per-provider exceptions live
//!
//! ## Optional Dependencies
//!
//! - `AppLauncher` - opens the chosen provider on redirect. Without one the
//!   core still decides, and the host acts on the returned outcome itself.
//!
//! When the `desktop-shims` feature is enabled, a `SqliteSettingsStore` at
//! `settings_path` (or the platform config dir) and a `SystemUrlLauncher` are
//! injected if none were provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .settings_store(Arc::new(MySettingsStore::new()))
//!     .app_launcher(Arc::new(MyLauncher))
//!     .launch_on_redirect(true)
//!     .build()
//!     .await?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AppLauncher, SettingsStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Upper bound for the event buffer; larger values only hide stuck subscribers.
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration. Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// User preferences storage (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Opens provider apps on redirect (optional)
    pub app_launcher: Option<Arc<dyn AppLauncher>>,

    /// Per-subscriber event buffer
    pub event_buffer_size: usize,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("settings_store", &"SettingsStore { ... }")
            .field(
                "app_launcher",
                &self.app_launcher.as_ref().map(|_| "AppLauncher { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Launch the chosen provider when a link is redirected (requires AppLauncher)
    pub launch_on_redirect: bool,

    /// Accept chosen-provider values stored as a link pattern
    /// (e.g. `open.spotify.com`) in addition to provider ids
    pub accept_legacy_provider_values: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            launch_on_redirect: false,
            accept_legacy_provider_values: true,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an actionable error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.features.launch_on_redirect && self.app_launcher.is_none() {
            return Err(Error::Config(
                "Launch on redirect enabled but no AppLauncher provided. \
                 Disable the feature or inject an AppLauncher implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for user preferences. \
                 Desktop: enable the 'desktop-shims' feature to use the default SqliteSettingsStore. \
                 Android: inject a DataStore-backed settings store."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
async fn provide_default_settings_store(
    settings_path: Option<PathBuf>,
) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;

    let path = settings_path.unwrap_or_else(SqliteSettingsStore::default_path);
    let store = SqliteSettingsStore::new(path).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
async fn provide_default_settings_store(
    _settings_path: Option<PathBuf>,
) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_launcher() -> Option<Arc<dyn AppLauncher>> {
    Some(Arc::new(bridge_desktop::SystemUrlLauncher::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_launcher() -> Option<Arc<dyn AppLauncher>> {
    None
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    settings_path: Option<PathBuf>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    app_launcher: Option<Arc<dyn AppLauncher>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Location of the default desktop settings database.
    ///
    /// Ignored when a settings store is injected or `desktop-shims` is off.
    pub fn settings_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn app_launcher(mut self, launcher: Arc<dyn AppLauncher>) -> Self {
        self.app_launcher = Some(launcher);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn launch_on_redirect(mut self, enabled: bool) -> Self {
        self.features.launch_on_redirect = enabled;
        self
    }

    pub fn accept_legacy_provider_values(mut self, enabled: bool) -> Self {
        self.features.accept_legacy_provider_values = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// Async because the default desktop settings store opens its database.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when no settings store is available
    /// - `Config` when validation fails
    /// - `Bridge` when the default store cannot be opened
    pub async fn build(self) -> Result<CoreConfig> {
        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(self.settings_path).await?,
        };

        let app_launcher = self.app_launcher.or_else(provide_default_launcher);

        let config = CoreConfig {
            settings_store,
            app_launcher,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::storage::{SettingValue, SettingsChange, SettingsTransaction};
    use bridge_traits::{BridgeError, LaunchRequest};
    use std::collections::HashMap;
    use tokio::sync::broadcast;

    struct MockSettingsStore;

    #[async_trait]
    impl SettingsStore for MockSettingsStore {
        async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn set_bool(&self, _key: &str, _value: bool) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_bool(&self, _key: &str) -> BridgeResult<Option<bool>> {
            Ok(None)
        }

        async fn get_many(&self, _keys: &[String]) -> BridgeResult<HashMap<String, SettingValue>> {
            Ok(HashMap::new())
        }

        async fn delete(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn has_key(&self, _key: &str) -> BridgeResult<bool> {
            Ok(false)
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            Ok(())
        }

        async fn begin_transaction(&self) -> BridgeResult<Box<dyn SettingsTransaction + Send>> {
            Err(BridgeError::NotAvailable("transactions".to_string()))
        }

        fn subscribe(&self) -> broadcast::Receiver<SettingsChange> {
            broadcast::channel(1).1
        }
    }

    struct MockLauncher;

    #[async_trait]
    impl AppLauncher for MockLauncher {
        async fn launch(&self, _request: LaunchRequest) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn base_builder() -> CoreConfigBuilder {
        CoreConfig::builder().settings_store(Arc::new(MockSettingsStore))
    }

    #[tokio::test]
    async fn test_builder_with_required_fields() {
        let config = base_builder().build().await.unwrap();

        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(!config.features.launch_on_redirect);
        assert!(config.features.accept_legacy_provider_values);
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[tokio::test]
    async fn test_builder_requires_settings_store() {
        let result = CoreConfig::builder().build().await;
        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "SettingsStore")
            }
            other => panic!("expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[tokio::test]
    async fn test_build_with_desktop_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::builder()
            .settings_path(dir.path().join("settings.db"))
            .build()
            .await
            .unwrap();

        assert!(config.app_launcher.is_some());
        assert!(dir.path().join("settings.db").exists());
    }

    #[tokio::test]
    async fn test_launch_requires_launcher() {
        let result = CoreConfig::builder()
            .settings_store(Arc::new(MockSettingsStore))
            .launch_on_redirect(true)
            .build()
            .await;

        if cfg!(feature = "desktop-shims") {
            assert!(result.is_ok());
        } else {
            assert!(matches!(result, Err(Error::Config(_))));
        }
    }

    #[tokio::test]
    async fn test_launch_with_launcher() {
        let config = base_builder()
            .app_launcher(Arc::new(MockLauncher))
            .launch_on_redirect(true)
            .build()
            .await
            .unwrap();

        assert!(config.features.launch_on_redirect);
    }

    #[tokio::test]
    async fn test_validate_rejects_zero_buffer() {
        let result = base_builder().event_buffer_size(0).build().await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_validate_rejects_excessive_buffer() {
        let result = base_builder()
            .event_buffer_size(MAX_EVENT_BUFFER_SIZE + 1)
            .build()
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_feature_flags_default() {
        let flags = FeatureFlags::default();
        assert!(!flags.launch_on_redirect);
        assert!(flags.accept_legacy_provider_values);
    }
}
