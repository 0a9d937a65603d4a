//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the link-routing core and the
//! platform that embeds it. The core never talks to Android `DataStore`,
//! `startActivity` or a desktop URL opener directly; it asks for one of the
//! capabilities below instead.
//!
//! ## Traits
//!
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage with change notifications
//! - [`AppLauncher`](launcher::AppLauncher) - Open a provider app (or its web fallback) at a URL
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | Android  | host app            | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert their native failures into it and keep the
//! message actionable (which key, which package, which command).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so that a single implementation can be
//! shared between the preference watcher task and the deep-link handler.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::launcher::{AppLauncher, LaunchRequest};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct IntentLauncher;
//!
//! #[async_trait]
//! impl AppLauncher for IntentLauncher {
//!     async fn launch(&self, request: LaunchRequest) -> Result<()> {
//!         // Build an ACTION_VIEW intent targeting request.package_id
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod launcher;
pub mod log;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use launcher::{AppLauncher, LaunchRequest};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use storage::{SettingValue, SettingsChange, SettingsStore, SettingsTransaction};
