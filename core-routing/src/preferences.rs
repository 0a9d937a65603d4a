//! # Preferences
//!
//! [`PreferenceSnapshot`] is the immutable view of the user's routing
//! preferences that the engine consumes. [`PreferenceRepository`] reads and
//! writes it through the host's [`SettingsStore`].
//!
//! ## Persisted keys
//!
//! | key                     | type   | meaning                               |
//! |-------------------------|--------|---------------------------------------|
//! | `music_provider`        | string | chosen provider id                    |
//! | `playlist_choice`       | bool   | redirect playlist links               |
//! | `album_choice`          | bool   | redirect album links                  |
//! | `loading_choice`        | bool   | show the loading screen (UI only)     |
//! | `<provider id>_exception` | bool | never redirect links from provider    |
//!
//! Absent keys read as `""` / `false`.

use crate::error::{Result, RoutingError};
use crate::provider::ProviderRegistry;
use bridge_traits::{BridgeError, SettingValue, SettingsStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Settings keys.
pub mod keys {
    pub const MUSIC_PROVIDER: &str = "music_provider";
    pub const PLAYLIST_CHOICE: &str = "playlist_choice";
    pub const ALBUM_CHOICE: &str = "album_choice";
    pub const LOADING_CHOICE: &str = "loading_choice";

    const EXCEPTION_SUFFIX: &str = "_exception";

    /// Key of the override flag for `provider_id`.
    pub fn exception(provider_id: &str) -> String {
        format!("{}{}", provider_id, EXCEPTION_SUFFIX)
    }
}

/// Immutable routing preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceSnapshot {
    /// Provider id links are redirected to; empty when never chosen.
    pub chosen_provider: String,
    pub redirect_playlists: bool,
    pub redirect_albums: bool,
    /// Provider id to "never redirect links from this provider".
    pub overrides: BTreeMap<String, bool>,
    /// Loading screen flag. Not consulted when routing.
    pub show_loading: bool,
}

impl PreferenceSnapshot {
    pub fn new(chosen_provider: impl Into<String>) -> Self {
        Self {
            chosen_provider: chosen_provider.into(),
            ..Default::default()
        }
    }

    /// Default snapshot with an explicit `false` override for every provider.
    pub fn empty(registry: &ProviderRegistry) -> Self {
        Self::default().with_registry(registry)
    }

    pub fn with_redirects(mut self, playlists: bool, albums: bool) -> Self {
        self.redirect_playlists = playlists;
        self.redirect_albums = albums;
        self
    }

    pub fn with_override(mut self, provider_id: impl Into<String>, enabled: bool) -> Self {
        self.overrides.insert(provider_id.into(), enabled);
        self
    }

    pub fn with_show_loading(mut self, show: bool) -> Self {
        self.show_loading = show;
        self
    }

    /// Fills in `false` for every registry provider without an override entry.
    pub fn with_registry(mut self, registry: &ProviderRegistry) -> Self {
        for id in registry.ids() {
            self.overrides.entry(id.to_string()).or_insert(false);
        }
        self
    }

    /// Override flag for `provider_id`, `false` when absent.
    pub fn override_for(&self, provider_id: &str) -> bool {
        self.overrides.get(provider_id).copied().unwrap_or(false)
    }

    pub fn has_chosen_provider(&self) -> bool {
        !self.chosen_provider.is_empty()
    }
}

/// Partial preference write. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceUpdate {
    pub chosen_provider: Option<String>,
    pub redirect_playlists: Option<bool>,
    pub redirect_albums: Option<bool>,
    pub overrides: BTreeMap<String, bool>,
    pub show_loading: Option<bool>,
}

impl PreferenceUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider choice together with both redirect toggles, as saved from the
    /// main settings screen.
    pub fn choices(provider_id: impl Into<String>, playlists: bool, albums: bool) -> Self {
        Self::new()
            .chosen_provider(provider_id)
            .redirect_playlists(playlists)
            .redirect_albums(albums)
    }

    /// Override flags together with the loading flag, as saved from the
    /// exceptions screen.
    pub fn exceptions<I, S>(overrides: I, show_loading: bool) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let mut update = Self::new().show_loading(show_loading);
        for (id, enabled) in overrides {
            update.overrides.insert(id.into(), enabled);
        }
        update
    }

    pub fn chosen_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.chosen_provider = Some(provider_id.into());
        self
    }

    pub fn redirect_playlists(mut self, enabled: bool) -> Self {
        self.redirect_playlists = Some(enabled);
        self
    }

    pub fn redirect_albums(mut self, enabled: bool) -> Self {
        self.redirect_albums = Some(enabled);
        self
    }

    pub fn override_provider(mut self, provider_id: impl Into<String>, enabled: bool) -> Self {
        self.overrides.insert(provider_id.into(), enabled);
        self
    }

    pub fn show_loading(mut self, enabled: bool) -> Self {
        self.show_loading = Some(enabled);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.chosen_provider.is_none()
            && self.redirect_playlists.is_none()
            && self.redirect_albums.is_none()
            && self.overrides.is_empty()
            && self.show_loading.is_none()
    }

    /// Settings keys this update writes.
    pub fn keys(&self) -> Vec<String> {
        let mut written = Vec::new();
        if self.chosen_provider.is_some() {
            written.push(keys::MUSIC_PROVIDER.to_string());
        }
        if self.redirect_playlists.is_some() {
            written.push(keys::PLAYLIST_CHOICE.to_string());
        }
        if self.redirect_albums.is_some() {
            written.push(keys::ALBUM_CHOICE.to_string());
        }
        if self.show_loading.is_some() {
            written.push(keys::LOADING_CHOICE.to_string());
        }
        written.extend(self.overrides.keys().map(|id| keys::exception(id)));
        written
    }
}

/// Reads and writes [`PreferenceSnapshot`]s through a [`SettingsStore`].
pub struct PreferenceRepository {
    store: Arc<dyn SettingsStore>,
    registry: Arc<ProviderRegistry>,
    accept_legacy_values: bool,
}

impl PreferenceRepository {
    pub fn new(store: Arc<dyn SettingsStore>, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            store,
            registry,
            accept_legacy_values: true,
        }
    }

    /// Whether chosen-provider values stored as a link pattern are mapped to
    /// provider ids on load.
    pub fn with_legacy_values(mut self, accept: bool) -> Self {
        self.accept_legacy_values = accept;
        self
    }

    pub fn store(&self) -> &Arc<dyn SettingsStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Every settings key a snapshot is derived from.
    pub fn tracked_keys(&self) -> Vec<String> {
        let mut tracked = vec![
            keys::MUSIC_PROVIDER.to_string(),
            keys::PLAYLIST_CHOICE.to_string(),
            keys::ALBUM_CHOICE.to_string(),
            keys::LOADING_CHOICE.to_string(),
        ];
        tracked.extend(self.registry.ids().map(keys::exception));
        tracked
    }

    /// Reads a complete snapshot.
    ///
    /// Every tracked key comes from a single [`SettingsStore::get_many`] call,
    /// so a concurrent [`save`](Self::save) is seen entirely or not at all.
    ///
    /// # Errors
    ///
    /// Any store read error, or a key stored with the wrong type, fails the
    /// whole load with [`RoutingError::Preferences`]; partial snapshots are
    /// never returned.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<PreferenceSnapshot> {
        let values = self
            .store
            .get_many(&self.tracked_keys())
            .await
            .map_err(RoutingError::Preferences)?;

        let raw_provider = string_value(&values, keys::MUSIC_PROVIDER)?;
        let chosen_provider = self
            .registry
            .normalize_provider_value(&raw_provider, self.accept_legacy_values);
        if chosen_provider != raw_provider {
            debug!(
                stored = %raw_provider,
                provider = %chosen_provider,
                "Normalized stored provider value"
            );
        } else if !chosen_provider.is_empty() && !self.registry.contains(&chosen_provider) {
            warn!(provider = %chosen_provider, "Stored provider is not in the registry");
        }

        let mut overrides = BTreeMap::new();
        for id in self.registry.ids() {
            let enabled = flag_value(&values, &keys::exception(id))?;
            overrides.insert(id.to_string(), enabled);
        }

        let snapshot = PreferenceSnapshot {
            chosen_provider,
            redirect_playlists: flag_value(&values, keys::PLAYLIST_CHOICE)?,
            redirect_albums: flag_value(&values, keys::ALBUM_CHOICE)?,
            overrides,
            show_loading: flag_value(&values, keys::LOADING_CHOICE)?,
        };

        debug!(provider = %snapshot.chosen_provider, "Loaded preferences");
        Ok(snapshot)
    }

    /// Applies `update` in a single settings transaction.
    ///
    /// # Errors
    ///
    /// - [`RoutingError::UnknownProvider`] if the update names a provider that
    ///   is not in the registry (nothing is written)
    /// - [`RoutingError::Preferences`] if the store rejects the write
    #[instrument(skip(self, update), fields(keys = update.keys().len()))]
    pub async fn save(&self, update: PreferenceUpdate) -> Result<()> {
        if update.is_empty() {
            debug!("Empty preference update, nothing to save");
            return Ok(());
        }

        if let Some(provider) = &update.chosen_provider {
            self.registry.lookup(provider)?;
        }
        for id in update.overrides.keys() {
            self.registry.lookup(id)?;
        }

        let mut tx = self
            .store
            .begin_transaction()
            .await
            .map_err(RoutingError::Preferences)?;

        let written = async {
            if let Some(provider) = &update.chosen_provider {
                tx.set_string(keys::MUSIC_PROVIDER, provider).await?;
            }
            if let Some(enabled) = update.redirect_playlists {
                tx.set_bool(keys::PLAYLIST_CHOICE, enabled).await?;
            }
            if let Some(enabled) = update.redirect_albums {
                tx.set_bool(keys::ALBUM_CHOICE, enabled).await?;
            }
            if let Some(enabled) = update.show_loading {
                tx.set_bool(keys::LOADING_CHOICE, enabled).await?;
            }
            for (id, enabled) in &update.overrides {
                tx.set_bool(&keys::exception(id), *enabled).await?;
            }
            Ok::<(), bridge_traits::BridgeError>(())
        }
        .await;

        if let Err(e) = written {
            warn!(error = %e, "Preference write failed, rolling back");
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            return Err(RoutingError::Preferences(e));
        }

        tx.commit().await.map_err(RoutingError::Preferences)?;
        info!(keys = ?update.keys(), "Saved preferences");
        Ok(())
    }

    /// Saves the chosen provider and both redirect toggles.
    pub async fn save_choices(
        &self,
        provider_id: &str,
        redirect_playlists: bool,
        redirect_albums: bool,
    ) -> Result<()> {
        self.save(PreferenceUpdate::choices(
            provider_id,
            redirect_playlists,
            redirect_albums,
        ))
        .await
    }

    /// Saves override flags and the loading flag.
    pub async fn save_exceptions(
        &self,
        overrides: BTreeMap<String, bool>,
        show_loading: bool,
    ) -> Result<()> {
        self.save(PreferenceUpdate::exceptions(overrides, show_loading))
            .await
    }
}

fn string_value(values: &HashMap<String, SettingValue>, key: &str) -> Result<String> {
    match values.get(key) {
        None => Ok(String::new()),
        Some(SettingValue::String(value)) => Ok(value.clone()),
        Some(other) => Err(type_mismatch(key, "string", other)),
    }
}

fn flag_value(values: &HashMap<String, SettingValue>, key: &str) -> Result<bool> {
    match values.get(key) {
        None => Ok(false),
        Some(SettingValue::Bool(value)) => Ok(*value),
        Some(other) => Err(type_mismatch(key, "bool", other)),
    }
}

fn type_mismatch(key: &str, expected: &str, found: &SettingValue) -> RoutingError {
    RoutingError::Preferences(BridgeError::TypeMismatch {
        key: key.to_string(),
        expected: expected.to_string(),
        actual: found.type_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ids;

    #[test]
    fn test_exception_keys() {
        assert_eq!(keys::exception(ids::APPLE_MUSIC), "apple_music_exception");
        assert_eq!(keys::exception(ids::YT_MUSIC), "yt_music_exception");
    }

    #[test]
    fn test_default_snapshot() {
        let snapshot = PreferenceSnapshot::default();
        assert_eq!(snapshot.chosen_provider, "");
        assert!(!snapshot.has_chosen_provider());
        assert!(!snapshot.redirect_playlists);
        assert!(!snapshot.redirect_albums);
        assert!(!snapshot.override_for(ids::SPOTIFY));
    }

    #[test]
    fn test_empty_snapshot_covers_registry() {
        let registry = ProviderRegistry::builtin();
        let snapshot = PreferenceSnapshot::empty(&registry);

        assert_eq!(snapshot.overrides.len(), registry.len());
        assert!(snapshot.overrides.values().all(|enabled| !enabled));
    }

    #[test]
    fn test_with_registry_keeps_existing_overrides() {
        let registry = ProviderRegistry::builtin();
        let snapshot = PreferenceSnapshot::new(ids::SPOTIFY)
            .with_override(ids::DEEZER, true)
            .with_registry(&registry);

        assert!(snapshot.override_for(ids::DEEZER));
        assert!(!snapshot.override_for(ids::ANGHAMI));
        assert_eq!(snapshot.overrides.len(), 5);
    }

    #[test]
    fn test_update_keys() {
        let update = PreferenceUpdate::choices(ids::SPOTIFY, true, false);
        assert_eq!(
            update.keys(),
            vec!["music_provider", "playlist_choice", "album_choice"]
        );

        let update = PreferenceUpdate::exceptions([(ids::DEEZER, true)], true);
        assert_eq!(update.keys(), vec!["loading_choice", "deezer_exception"]);

        assert!(PreferenceUpdate::new().is_empty());
        assert!(!update.is_empty());
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = PreferenceSnapshot::new(ids::SPOTIFY).with_redirects(true, false);
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: PreferenceSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
