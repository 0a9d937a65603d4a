//! Snapshot loads racing multi-key saves on a file-backed store.

use bridge_desktop::SqliteSettingsStore;
use bridge_traits::SettingsStore;
use core_routing::provider::ids;
use core_routing::{PreferenceRepository, PreferenceSnapshot, PreferenceUpdate, ProviderRegistry};
use std::sync::Arc;
use tempfile::TempDir;

const SAVES: usize = 200;

fn quiet() -> PreferenceUpdate {
    PreferenceUpdate::choices(ids::APPLE_MUSIC, false, false)
}

fn eager() -> PreferenceUpdate {
    PreferenceUpdate::choices(ids::SPOTIFY, true, true)
}

fn is_consistent(snapshot: &PreferenceSnapshot) -> bool {
    let fields = (
        snapshot.chosen_provider.as_str(),
        snapshot.redirect_playlists,
        snapshot.redirect_albums,
    );
    fields == (ids::APPLE_MUSIC, false, false) || fields == (ids::SPOTIFY, true, true)
}

async fn file_repository(dir: &TempDir) -> Arc<PreferenceRepository> {
    let store: Arc<dyn SettingsStore> = Arc::new(
        SqliteSettingsStore::new(dir.path().join("settings.db"))
            .await
            .unwrap(),
    );
    Arc::new(PreferenceRepository::new(
        store,
        Arc::new(ProviderRegistry::builtin()),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_load_never_mixes_two_saves() {
    let dir = TempDir::new().unwrap();
    let repository = file_repository(&dir).await;
    repository.save(quiet()).await.unwrap();

    let writer = {
        let repository = Arc::clone(&repository);
        tokio::spawn(async move {
            for round in 0..SAVES {
                let update = if round % 2 == 0 { eager() } else { quiet() };
                repository.save(update).await.unwrap();
            }
        })
    };

    let mut loads = 0;
    loop {
        let snapshot = repository.load().await.unwrap();
        assert!(
            is_consistent(&snapshot),
            "load {} returned a mixed snapshot: {:?}",
            loads,
            snapshot
        );
        loads += 1;
        if writer.is_finished() {
            break;
        }
    }
    writer.await.unwrap();

    // SAVES is even, so the last write is `quiet`.
    let last = repository.load().await.unwrap();
    assert_eq!(last.chosen_provider, ids::APPLE_MUSIC);
    assert!(!last.redirect_playlists);
}
