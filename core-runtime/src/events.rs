//! # Event Bus System
//!
//! Broadcasts what the core is doing (preference reloads, routing decisions,
//! launches) to any number of observers using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wrapping `PreferenceEvent` and `RoutingEvent`
//! - **EventBus**: central broadcast channel
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! ```text
//! ┌──────────────────┐  emit   ┌──────────┐  subscribe  ┌────────────┐
//! │ PreferenceWatcher├────────>│          ├────────────>│ Host UI    │
//! └──────────────────┘         │ EventBus │             └────────────┘
//! ┌──────────────────┐  emit   │          │  subscribe  ┌────────────┐
//! │ DeepLinkHandler  ├────────>│          ├────────────>│ Diagnostics│
//! └──────────────────┘         └──────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, RoutingEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Routing(RoutingEvent::LinkReceived {
//!     link: "https://open.spotify.com/album/1".to_string(),
//! }))
//! .ok();
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.description(), "Deep link received");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; keep reading.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! Emitting with no subscribers returns an error; publishers ignore it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Preferences(PreferenceEvent),
    Routing(RoutingEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Preferences(e) => e.description(),
            CoreEvent::Routing(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Routing(RoutingEvent::Failed { .. })
            | CoreEvent::Routing(RoutingEvent::LaunchFailed { .. }) => EventSeverity::Error,
            CoreEvent::Preferences(PreferenceEvent::LoadFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Routing(RoutingEvent::Launched { .. })
            | CoreEvent::Preferences(PreferenceEvent::Updated { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Preference Events
// ============================================================================

/// Events about the stored preference snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PreferenceEvent {
    /// First snapshot read from the store; routing no longer uses defaults.
    Loaded {
        /// Chosen provider id ("" when the user never picked one).
        chosen_provider: String,
    },
    /// A newer snapshot replaced the previous one.
    Updated {
        chosen_provider: String,
        /// Store keys that triggered the reload (empty when everything was cleared).
        changed_keys: Vec<String>,
    },
    /// Reading the store failed; the previous snapshot stays in effect.
    LoadFailed { message: String },
}

impl PreferenceEvent {
    fn description(&self) -> &str {
        match self {
            PreferenceEvent::Loaded { .. } => "Preferences loaded",
            PreferenceEvent::Updated { .. } => "Preferences updated",
            PreferenceEvent::LoadFailed { .. } => "Preferences could not be loaded",
        }
    }
}

// ============================================================================
// Routing Events
// ============================================================================

/// Events emitted while handling a single deep link.
///
/// `link` fields carry the link with query and fragment removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RoutingEvent {
    LinkReceived { link: String },
    /// The decision engine produced an outcome.
    Decided {
        link: String,
        /// Provider that generated the link, if recognised.
        origin: Option<String>,
        /// `playlist`, `album` or `other`
        kind: String,
        /// Name of the rule that settled the outcome.
        rule: String,
        /// `true` when the link is redirected to the chosen provider.
        redirected: bool,
    },
    Launched { package_id: String, url: String },
    LaunchFailed { package_id: String, message: String },
    /// No outcome could be produced (e.g. chosen provider not in the registry).
    Failed { link: String, message: String },
}

impl RoutingEvent {
    fn description(&self) -> &str {
        match self {
            RoutingEvent::LinkReceived { .. } => "Deep link received",
            RoutingEvent::Decided { redirected: true, .. } => "Link redirected to chosen provider",
            RoutingEvent::Decided { .. } => "Link left to originating app",
            RoutingEvent::Launched { .. } => "Provider app launched",
            RoutingEvent::LaunchFailed { .. } => "Provider app launch failed",
            RoutingEvent::Failed { .. } => "Link routing failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus built on `tokio::sync::broadcast`.
///
/// Cloning is cheap; clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let routing_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Routing(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive; `None` when nothing matching is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
