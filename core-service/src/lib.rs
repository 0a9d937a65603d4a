//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (settings store, app
//! launcher) into the link-routing core. Desktop apps typically enable the
//! `desktop-shims` feature, which lets [`CoreConfig`](core_runtime::config::CoreConfig)
//! fall back to the SQLite settings store and the system URL opener.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::CoreService;
//!
//! let config = CoreConfig::builder().build().await?;
//! let core = CoreService::bootstrap(config).await?;
//!
//! match core.handle_deep_link(link).await? {
//!     Outcome::SameApp => { /* let the OS open it */ }
//!     Outcome::DifferentApp { .. } => { /* already launched or act on it */ }
//! }
//! core.shutdown().await;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use bridge_traits::{AppLauncher, LaunchRequest, SettingsStore};
pub use core_routing::{
    Decision, LinkKind, Outcome, PreferenceSnapshot, PreferenceUpdate, ProviderConfig,
    ProviderRegistry, Rule,
};

use core_routing::{
    DecisionEngine, DeepLinkHandler, PreferenceRepository, PreferenceWatcher, SnapshotReader,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Primary façade exposed to host applications.
pub struct CoreService {
    registry: Arc<ProviderRegistry>,
    repository: Arc<PreferenceRepository>,
    watcher: PreferenceWatcher,
    engine: DecisionEngine,
    handler: DeepLinkHandler,
    events: EventBus,
}

impl CoreService {
    /// Starts the core with the built-in provider catalog.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        Self::bootstrap_with_registry(config, ProviderRegistry::builtin()).await
    }

    /// Starts the core with a custom provider catalog.
    ///
    /// Preferences are loaded in the background; until they arrive links are
    /// decided against the default snapshot. Use [`wait_ready`](Self::wait_ready)
    /// to wait for the stored preferences instead.
    #[instrument(skip_all, fields(providers = registry.len()))]
    pub async fn bootstrap_with_registry(
        config: CoreConfig,
        registry: ProviderRegistry,
    ) -> Result<Self> {
        config.validate()?;
        tokio::runtime::Handle::try_current().map_err(|e| {
            CoreError::InitializationFailed(format!("a Tokio runtime is required: {}", e))
        })?;

        let registry = Arc::new(registry);
        let events = EventBus::new(config.event_buffer_size);

        let repository = Arc::new(
            PreferenceRepository::new(config.settings_store.clone(), Arc::clone(&registry))
                .with_legacy_values(config.features.accept_legacy_provider_values),
        );
        let watcher = PreferenceWatcher::spawn(Arc::clone(&repository), events.clone());

        let engine = DecisionEngine::new(Arc::clone(&registry));
        let mut handler = DeepLinkHandler::new(engine.clone(), watcher.reader(), events.clone());
        if config.features.launch_on_redirect {
            if let Some(launcher) = config.app_launcher.clone() {
                handler = handler.with_launcher(launcher);
            }
        }

        info!(
            launch_on_redirect = handler.launches(),
            "Core service started"
        );

        Ok(Self {
            registry,
            repository,
            watcher,
            engine,
            handler,
            events,
        })
    }

    /// Routes one deep link, launching the chosen provider when configured to.
    pub async fn handle_deep_link(&self, uri: &str) -> Result<Outcome> {
        Ok(self.handler.handle(uri).await?)
    }

    /// Decides a link without events or side effects.
    pub fn decide(&self, uri: &str) -> Result<Outcome> {
        Ok(self.engine.decide(uri, &self.watcher.current())?)
    }

    /// Decides a link and reports the origin, kind and rule behind it.
    pub fn explain(&self, uri: &str) -> Result<Decision> {
        Ok(self.engine.explain(uri, &self.watcher.current())?)
    }

    /// Latest preference snapshot.
    pub fn preferences(&self) -> Arc<PreferenceSnapshot> {
        self.watcher.current()
    }

    pub fn is_ready(&self) -> bool {
        self.watcher.is_ready()
    }

    /// Waits for the first snapshot read from the store.
    pub async fn wait_ready(&self) -> Arc<PreferenceSnapshot> {
        let mut reader = self.watcher.reader();
        match reader.wait_ready().await {
            Some(snapshot) => snapshot,
            None => reader.current(),
        }
    }

    /// Persists a partial preference change. The new snapshot is published
    /// once the store reports the write.
    pub async fn save_preferences(&self, update: PreferenceUpdate) -> Result<()> {
        debug!(keys = ?update.keys(), "Saving preferences");
        Ok(self.repository.save(update).await?)
    }

    /// Re-reads preferences from the store immediately.
    pub async fn reload_preferences(&self) -> Result<()> {
        Ok(self.watcher.refresh().await?)
    }

    pub fn providers(&self) -> &[ProviderConfig] {
        self.registry.providers()
    }

    pub fn snapshot_reader(&self) -> SnapshotReader {
        self.watcher.reader()
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Stops the preference watcher. Routing keeps using the last snapshot.
    pub async fn shutdown(&self) {
        self.watcher.shutdown().await;
        info!("Core service stopped");
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("providers", &self.registry.len())
            .field("watcher", &self.watcher)
            .field("handler", &self.handler)
            .finish()
    }
}
