//! Settings Storage Abstractions
//!
//! Provides the platform-agnostic key-value preferences store the routing core
//! reads its snapshot from.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;

use crate::error::Result;

/// Notification that one or more keys were written.
///
/// A committed transaction produces a single change listing every key it
/// touched, so observers can reload once per logical update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsChange {
    pub keys: Vec<String>,
}

impl SettingsChange {
    pub fn single(key: impl Into<String>) -> Self {
        Self {
            keys: vec![key.into()],
        }
    }

    /// Change emitted by `clear_all`, which touches every key.
    pub fn cleared() -> Self {
        Self { keys: Vec::new() }
    }

    pub fn touches(&self, key: &str) -> bool {
        self.keys.is_empty() || self.keys.iter().any(|k| k == key)
    }
}

/// A stored value together with the type it was written as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValue {
    String(String),
    Bool(bool),
}

impl SettingValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::String(_) => "string",
            SettingValue::Bool(_) => "bool",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(value) => Some(value),
            SettingValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(value) => Some(*value),
            SettingValue::String(_) => None,
        }
    }
}

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences/settings storage:
/// - Android: Preferences DataStore
/// - iOS: UserDefaults
/// - Desktop: SQLite file (see `bridge-desktop`)
///
/// Absent keys are reported as `Ok(None)`; deciding on a default is the
/// caller's job.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn choose_spotify(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("music_provider", "spotify").await?;
///     store.set_bool("playlist_choice", true).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a boolean value
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Retrieve a boolean value
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Read several keys from one consistent state of the store.
    ///
    /// A write committed concurrently is either fully visible or not at all.
    /// Absent keys are left out of the map.
    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, SettingValue>>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool>;

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all settings
    async fn clear_all(&self) -> Result<()>;

    /// Begin a transaction for atomic multi-key updates
    ///
    /// Nothing is visible to readers or subscribers until `commit` succeeds.
    async fn begin_transaction(&self) -> Result<Box<dyn SettingsTransaction + Send>>;

    /// Subscribe to write notifications.
    ///
    /// Every successful write (or committed transaction) is announced once.
    /// Receivers that fall behind get `RecvError::Lagged` and should reload
    /// everything they care about.
    fn subscribe(&self) -> broadcast::Receiver<SettingsChange>;
}

/// Transaction for atomic settings updates
#[async_trait]
pub trait SettingsTransaction: Send {
    /// Set a string value within the transaction
    async fn set_string(&mut self, key: &str, value: &str) -> Result<()>;

    /// Set a boolean value within the transaction
    async fn set_bool(&mut self, key: &str, value: bool) -> Result<()>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}
