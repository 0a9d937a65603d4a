//! # Link Routing Core
//!
//! Decides whether a music deep link should open in the app that produced it
//! or be redirected to the provider the user prefers.
//!
//! ## Overview
//!
//! - [`provider`] - the fixed, ordered catalog of supported providers
//! - [`classifier`] - playlist / album / other classification of a link
//! - [`preferences`] - the immutable preference snapshot and its persistence
//! - [`engine`] - the pure decision function
//! - [`watcher`] - keeps the latest snapshot available without blocking
//! - [`handler`] - deep-link entry point: decide, report, launch
//!
//! ```text
//! link ──> ProviderRegistry ─┐
//!      └─> classify ─────────┼─> DecisionEngine ─> Outcome ─> AppLauncher
//! SettingsStore ─> PreferenceWatcher ─(snapshot)─┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use core_routing::{DecisionEngine, Outcome, PreferenceSnapshot, ProviderRegistry};
//! use std::sync::Arc;
//!
//! let engine = DecisionEngine::new(Arc::new(ProviderRegistry::builtin()));
//! let snapshot = PreferenceSnapshot::new("spotify").with_redirects(true, true);
//!
//! let outcome = engine
//!     .decide("https://music.apple.com/us/playlist/chill/pl.u-123", &snapshot)
//!     .unwrap();
//! assert_eq!(
//!     outcome,
//!     Outcome::DifferentApp {
//!         package_id: "com.spotify.music".to_string(),
//!         search_url: "spotify:search:".to_string(),
//!     }
//! );
//! ```

pub mod classifier;
pub mod engine;
pub mod error;
pub mod handler;
pub mod preferences;
pub mod provider;
pub mod watcher;

pub use classifier::{classify, LinkKind};
pub use engine::{Decision, DecisionEngine, Outcome, Rule};
pub use error::{Result, RoutingError};
pub use handler::DeepLinkHandler;
pub use preferences::{PreferenceRepository, PreferenceSnapshot, PreferenceUpdate};
pub use provider::{ProviderConfig, ProviderRegistry};
pub use watcher::{PreferenceWatcher, SnapshotReader};
