//! Deep-link entry point.
//!
//! [`DeepLinkHandler::handle`] is what the host calls for every intercepted
//! link. It reads the latest snapshot, asks the engine for an outcome, reports
//! the decision on the event bus and, when a launcher is attached, opens the
//! chosen provider for [`Outcome::DifferentApp`].

use crate::engine::{DecisionEngine, Outcome};
use crate::error::{Result, RoutingError};
use crate::watcher::SnapshotReader;
use bridge_traits::AppLauncher;
use core_runtime::events::{CoreEvent, EventBus, RoutingEvent};
use core_runtime::logging::redact_link;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct DeepLinkHandler {
    engine: DecisionEngine,
    snapshots: SnapshotReader,
    events: EventBus,
    launcher: Option<Arc<dyn AppLauncher>>,
}

impl DeepLinkHandler {
    /// Handler that only decides; the host acts on the returned outcome.
    pub fn new(engine: DecisionEngine, snapshots: SnapshotReader, events: EventBus) -> Self {
        Self {
            engine,
            snapshots,
            events,
            launcher: None,
        }
    }

    /// Opens the chosen provider through `launcher` on redirect.
    pub fn with_launcher(mut self, launcher: Arc<dyn AppLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn launches(&self) -> bool {
        self.launcher.is_some()
    }

    /// Decides without emitting events or launching anything.
    pub fn decide(&self, uri: &str) -> Result<Outcome> {
        self.engine.decide(uri, &self.snapshots.current())
    }

    /// Handles one deep link.
    ///
    /// # Errors
    ///
    /// - [`RoutingError::UnknownProvider`] when the chosen provider is not in
    ///   the registry; nothing is launched
    /// - [`RoutingError::Launch`] when the launcher fails
    #[instrument(
        skip_all,
        fields(request_id = %uuid::Uuid::new_v4(), link = %redact_link(uri))
    )]
    pub async fn handle(&self, uri: &str) -> Result<Outcome> {
        let link = redact_link(uri).to_string();
        self.emit(RoutingEvent::LinkReceived { link: link.clone() });

        let snapshot = self.snapshots.current();
        if !self.snapshots.is_ready() {
            debug!("Preferences not loaded yet, deciding with defaults");
        }

        let decision = match self.engine.explain(uri, &snapshot) {
            Ok(decision) => decision,
            Err(e) => {
                error!(error = %e, "Failed to route link");
                self.emit(RoutingEvent::Failed {
                    link,
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        info!(
            origin = decision.origin.as_deref().unwrap_or("unknown"),
            kind = %decision.kind,
            rule = %decision.rule,
            redirected = decision.outcome.is_redirect(),
            "Routed link"
        );
        self.emit(RoutingEvent::Decided {
            link,
            origin: decision.origin.clone(),
            kind: decision.kind.to_string(),
            rule: decision.rule.to_string(),
            redirected: decision.outcome.is_redirect(),
        });

        if let (Some(launcher), Some(request)) =
            (&self.launcher, decision.outcome.launch_request())
        {
            let package_id = request.package_id.clone();
            let url = request.url.clone();

            match launcher.launch(request).await {
                Ok(()) => {
                    debug!(package_id = %package_id, "Launched provider");
                    self.emit(RoutingEvent::Launched { package_id, url });
                }
                Err(e) => {
                    warn!(package_id = %package_id, error = %e, "Failed to launch provider");
                    self.emit(RoutingEvent::LaunchFailed {
                        package_id,
                        message: e.to_string(),
                    });
                    return Err(RoutingError::Launch(e));
                }
            }
        }

        Ok(decision.outcome)
    }

    fn emit(&self, event: RoutingEvent) {
        // No subscribers is fine.
        let _ = self.events.emit(CoreEvent::Routing(event));
    }
}

impl std::fmt::Debug for DeepLinkHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepLinkHandler")
            .field("engine", &self.engine)
            .field("ready", &self.snapshots.is_ready())
            .field("launches", &self.launches())
            .finish()
    }
}
