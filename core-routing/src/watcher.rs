//! # Preference Watcher
//!
//! Keeps the most recent [`PreferenceSnapshot`] available to the routing path
//! without ever making it wait on storage.
//!
//! A background task loads the snapshot once at start-up and again after every
//! settings change that touches a preference key, then publishes it through a
//! `tokio::sync::watch` channel. Readers take an `Arc` of whatever was published
//! last. Until the first load completes they see the default snapshot, and
//! [`SnapshotReader::is_ready`] returns `false`.

use crate::error::Result;
use crate::preferences::{PreferenceRepository, PreferenceSnapshot};
use bridge_traits::SettingsChange;
use core_runtime::events::{CoreEvent, EventBus, PreferenceEvent};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct Published {
    snapshot: Arc<PreferenceSnapshot>,
    /// 0 until the first successful load.
    version: u64,
}

/// Read side of the snapshot channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    receiver: watch::Receiver<Published>,
}

impl SnapshotReader {
    /// A reader that always returns `snapshot`, already marked ready.
    pub fn from_snapshot(snapshot: PreferenceSnapshot) -> Self {
        let (_sender, receiver) = watch::channel(Published {
            snapshot: Arc::new(snapshot),
            version: 1,
        });
        Self { receiver }
    }

    /// Latest published snapshot.
    pub fn current(&self) -> Arc<PreferenceSnapshot> {
        self.receiver.borrow().snapshot.clone()
    }

    /// Whether a snapshot has been read from the store.
    pub fn is_ready(&self) -> bool {
        self.receiver.borrow().version > 0
    }

    /// Number of snapshots published so far.
    pub fn version(&self) -> u64 {
        self.receiver.borrow().version
    }

    /// Waits for the next published snapshot. `None` once the watcher is gone.
    pub async fn changed(&mut self) -> Option<Arc<PreferenceSnapshot>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().snapshot.clone())
    }

    /// Waits until a snapshot has been read from the store.
    pub async fn wait_ready(&mut self) -> Option<Arc<PreferenceSnapshot>> {
        self.receiver
            .wait_for(|published| published.version > 0)
            .await
            .ok()
            .map(|published| published.snapshot.clone())
    }

    /// Waits until the published snapshot satisfies `predicate`.
    pub async fn wait_until<F>(&mut self, mut predicate: F) -> Option<Arc<PreferenceSnapshot>>
    where
        F: FnMut(&PreferenceSnapshot) -> bool,
    {
        self.receiver
            .wait_for(|published| published.version > 0 && predicate(&published.snapshot))
            .await
            .ok()
            .map(|published| published.snapshot.clone())
    }
}

struct Publisher {
    repository: Arc<PreferenceRepository>,
    sender: watch::Sender<Published>,
    events: EventBus,
    /// Serializes loads so an older read never overwrites a newer one.
    reload_lock: tokio::sync::Mutex<()>,
}

impl Publisher {
    /// Loads and publishes a snapshot. Returns whether anything changed.
    async fn reload(&self, changed_keys: Vec<String>) -> Result<bool> {
        let _guard = self.reload_lock.lock().await;

        let snapshot = match self.repository.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Failed to load preferences, keeping previous snapshot");
                let _ = self
                    .events
                    .emit(CoreEvent::Preferences(PreferenceEvent::LoadFailed {
                        message: e.to_string(),
                    }));
                return Err(e);
            }
        };

        let (first_load, unchanged) = {
            let current = self.sender.borrow();
            (current.version == 0, *current.snapshot == snapshot)
        };
        if !first_load && unchanged {
            debug!(keys = ?changed_keys, "Preferences unchanged");
            return Ok(false);
        }

        let chosen_provider = snapshot.chosen_provider.clone();
        self.sender.send_modify(|published| {
            published.snapshot = Arc::new(snapshot);
            published.version += 1;
        });

        let event = if first_load {
            info!(provider = %chosen_provider, "Preferences loaded");
            PreferenceEvent::Loaded { chosen_provider }
        } else {
            info!(provider = %chosen_provider, keys = ?changed_keys, "Preferences updated");
            PreferenceEvent::Updated {
                chosen_provider,
                changed_keys,
            }
        };
        let _ = self.events.emit(CoreEvent::Preferences(event));

        Ok(true)
    }
}

/// Owns the background task that publishes preference snapshots.
pub struct PreferenceWatcher {
    publisher: Arc<Publisher>,
    reader: SnapshotReader,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PreferenceWatcher {
    /// Starts watching. Must be called from within a Tokio runtime.
    pub fn spawn(repository: Arc<PreferenceRepository>, events: EventBus) -> Self {
        let initial = PreferenceSnapshot::empty(repository.registry());
        let (sender, receiver) = watch::channel(Published {
            snapshot: Arc::new(initial),
            version: 0,
        });

        // Subscribe before the first load so no write can slip in between.
        let changes = repository.store().subscribe();

        let publisher = Arc::new(Publisher {
            repository,
            sender,
            events,
            reload_lock: tokio::sync::Mutex::new(()),
        });
        let cancel = CancellationToken::new();
        let task = tokio::spawn(watch_settings(
            Arc::clone(&publisher),
            changes,
            cancel.clone(),
        ));

        Self {
            publisher,
            reader: SnapshotReader { receiver },
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    pub fn current(&self) -> Arc<PreferenceSnapshot> {
        self.reader.current()
    }

    pub fn is_ready(&self) -> bool {
        self.reader.is_ready()
    }

    /// Reloads from the store now instead of waiting for a change notification.
    pub async fn refresh(&self) -> Result<()> {
        self.publisher.reload(Vec::new()).await.map(|_| ())
    }

    /// Stops the background task and waits for it to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let task = match self.task.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Preference watcher task ended abnormally");
            }
        }
    }
}

impl Drop for PreferenceWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for PreferenceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceWatcher")
            .field("version", &self.reader.version())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

async fn watch_settings(
    publisher: Arc<Publisher>,
    mut changes: broadcast::Receiver<SettingsChange>,
    cancel: CancellationToken,
) {
    let tracked = publisher.repository.tracked_keys();

    // Failures are reported by the publisher; the default snapshot stays.
    let _ = publisher.reload(Vec::new()).await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Preference watcher cancelled");
                break;
            }
            change = changes.recv() => match change {
                Ok(change) => {
                    if !tracked.iter().any(|key| change.touches(key)) {
                        continue;
                    }
                    // A cleared store lists no keys.
                    let relevant: Vec<String> = tracked
                        .iter()
                        .filter(|key| change.keys.contains(*key))
                        .cloned()
                        .collect();
                    let _ = publisher.reload(relevant).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed settings notifications, reloading everything");
                    let _ = publisher.reload(Vec::new()).await;
                }
                Err(RecvError::Closed) => {
                    debug!("Settings store closed its change channel");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::PreferenceUpdate;
    use crate::provider::{ids, ProviderRegistry};
    use bridge_desktop::SqliteSettingsStore;
    use bridge_traits::SettingsStore;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    async fn repository() -> Arc<PreferenceRepository> {
        let store: Arc<dyn SettingsStore> = Arc::new(SqliteSettingsStore::in_memory().await.unwrap());
        Arc::new(PreferenceRepository::new(
            store,
            Arc::new(ProviderRegistry::builtin()),
        ))
    }

    #[test]
    fn test_fixed_reader() {
        let reader = SnapshotReader::from_snapshot(PreferenceSnapshot::new(ids::DEEZER));
        assert!(reader.is_ready());
        assert_eq!(reader.current().chosen_provider, ids::DEEZER);
    }

    #[tokio::test]
    async fn test_default_snapshot_before_first_load() {
        let watcher = PreferenceWatcher::spawn(repository().await, EventBus::default());

        // Current-thread runtime: the task has not run yet.
        assert!(!watcher.is_ready());
        let snapshot = watcher.current();
        assert_eq!(snapshot.chosen_provider, "");
        assert_eq!(snapshot.overrides.len(), 5);

        let mut reader = watcher.reader();
        let loaded = timeout(WAIT, reader.wait_ready()).await.unwrap().unwrap();
        assert_eq!(*loaded, *snapshot);
        assert!(watcher.is_ready());

        watcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_publishes_saved_preferences() {
        let repository = repository().await;
        let watcher = PreferenceWatcher::spawn(Arc::clone(&repository), EventBus::default());
        let mut reader = watcher.reader();
        timeout(WAIT, reader.wait_ready()).await.unwrap().unwrap();

        repository
            .save(PreferenceUpdate::choices(ids::SPOTIFY, true, false))
            .await
            .unwrap();

        let snapshot = timeout(WAIT, reader.wait_until(|s| s.chosen_provider == ids::SPOTIFY))
            .await
            .unwrap()
            .unwrap();
        assert!(snapshot.redirect_playlists);
        assert!(!snapshot.redirect_albums);

        watcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_unrelated_keys_do_not_republish() {
        let repository = repository().await;
        let watcher = PreferenceWatcher::spawn(Arc::clone(&repository), EventBus::default());
        let mut reader = watcher.reader();
        timeout(WAIT, reader.wait_ready()).await.unwrap().unwrap();
        let version = reader.version();

        repository
            .store()
            .set_string("window_geometry", "800x600")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(reader.version(), version);
        watcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_cleared_store_republishes_defaults() {
        let repository = repository().await;
        let events = EventBus::default();
        let mut receiver = events.subscribe();
        let watcher = PreferenceWatcher::spawn(Arc::clone(&repository), events);
        let mut reader = watcher.reader();
        timeout(WAIT, reader.wait_ready()).await.unwrap().unwrap();

        repository
            .save(PreferenceUpdate::choices(ids::ANGHAMI, true, true))
            .await
            .unwrap();
        timeout(WAIT, reader.wait_until(|s| s.chosen_provider == ids::ANGHAMI))
            .await
            .unwrap()
            .unwrap();

        repository.store().clear_all().await.unwrap();
        let cleared = timeout(WAIT, reader.wait_until(|s| !s.has_chosen_provider()))
            .await
            .unwrap()
            .unwrap();
        assert!(!cleared.redirect_playlists);

        // Loaded, Updated (save), Updated (clear) with no key list.
        let mut last = None;
        for _ in 0..3 {
            last = Some(timeout(WAIT, receiver.recv()).await.unwrap().unwrap());
        }
        match last {
            Some(CoreEvent::Preferences(PreferenceEvent::Updated { changed_keys, .. })) => {
                assert!(changed_keys.is_empty());
            }
            other => panic!("unexpected event {:?}", other),
        }

        watcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_emits_loaded_then_updated() {
        let repository = repository().await;
        let events = EventBus::default();
        let mut receiver = events.subscribe();
        let watcher = PreferenceWatcher::spawn(Arc::clone(&repository), events);

        let first = timeout(WAIT, receiver.recv()).await.unwrap().unwrap();
        assert!(matches!(
            first,
            CoreEvent::Preferences(PreferenceEvent::Loaded { .. })
        ));

        repository
            .save(PreferenceUpdate::new().override_provider(ids::DEEZER, true))
            .await
            .unwrap();

        let second = timeout(WAIT, receiver.recv()).await.unwrap().unwrap();
        match second {
            CoreEvent::Preferences(PreferenceEvent::Updated { changed_keys, .. }) => {
                assert_eq!(changed_keys, vec!["deezer_exception".to_string()]);
            }
            other => panic!("unexpected event {:?}", other),
        }

        watcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_refresh_and_shutdown() {
        let repository = repository().await;
        repository
            .store()
            .set_string("music_provider", "yt_music")
            .await
            .unwrap();

        let watcher = PreferenceWatcher::spawn(Arc::clone(&repository), EventBus::default());
        watcher.refresh().await.unwrap();
        assert!(watcher.is_ready());
        assert_eq!(watcher.current().chosen_provider, ids::YT_MUSIC);

        watcher.shutdown().await;
        // Second call is a no-op.
        watcher.shutdown().await;
    }
}
