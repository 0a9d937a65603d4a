//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `SettingsStore` using a SQLite-backed key-value table
//! - `AppLauncher` using the platform URL opener (`open`, `xdg-open`, `start`)
//!
//! Desktop hosts are mostly used for development and for exercising the
//! routing core end to end; there is no package manager, so launches open the
//! provider's search URL in whatever handles it.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{SqliteSettingsStore, SystemUrlLauncher};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = SqliteSettingsStore::new(SqliteSettingsStore::default_path()).await.unwrap();
//!     let launcher = SystemUrlLauncher::new();
//!
//!     // Use in core configuration
//! }
//! ```

mod launcher;
mod settings;

pub use launcher::SystemUrlLauncher;
pub use settings::SqliteSettingsStore;
