//! Favorites persistence integration tests.
//!
//! Favorites toggled in one engine must come back, flagged, in the next one
//! opened on the same SQLite file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use cinelist_core::{
    testing::{fixtures, MockDiscoverClient},
    DiscoverClient, EngineConfig, EngineHandle, SettingsBackend, SettingsStore,
    SqliteSettingsBackend,
};

fn open_settings(path: &Path) -> Arc<SettingsStore> {
    let backend = SqliteSettingsBackend::new(path).expect("Failed to open settings database");
    let store = SettingsStore::open(Arc::new(backend) as Arc<dyn SettingsBackend>)
        .expect("Failed to load settings");
    Arc::new(store)
}

async fn spawn_loaded(
    client: &Arc<MockDiscoverClient>,
    settings: &Arc<SettingsStore>,
) -> EngineHandle {
    let engine = EngineHandle::spawn(
        &EngineConfig::default(),
        20,
        Arc::clone(client) as Arc<dyn DiscoverClient>,
        Arc::clone(settings),
    );

    let mut rx = engine.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.page == 1 && !s.loading),
    )
    .await
    .expect("Timed out waiting for first page")
    .expect("Engine stopped");

    engine
}

#[tokio::test]
async fn test_favorites_survive_restart() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("cinelist.db");

    let client = Arc::new(MockDiscoverClient::new());
    client.set_page(1, fixtures::items(&[1, 2, 3])).await;

    {
        let settings = open_settings(&db_path);
        let engine = spawn_loaded(&client, &settings).await;

        assert_eq!(engine.toggle_favorite(3).await.unwrap(), Some(true));
        assert_eq!(engine.toggle_favorite(1).await.unwrap(), Some(true));
        engine.shutdown().await;
    }

    let settings = open_settings(&db_path);
    let restored = settings.favorites();
    let ids: Vec<_> = restored.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![3, 1]);
    assert!(restored.iter().all(|i| i.is_favorite));

    client.set_page(1, fixtures::items(&[3, 4])).await;
    let engine = spawn_loaded(&client, &settings).await;
    let snapshot = engine.snapshot();

    assert_eq!(snapshot.favorite_ids(), vec![3, 1]);
    assert!(snapshot.item(3).unwrap().is_favorite);
    assert!(!snapshot.item(4).unwrap().is_favorite);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_settings_survive_restart() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("cinelist.db");

    {
        let settings = open_settings(&db_path);
        settings.save_language("en-EN").await.unwrap();
        assert_eq!(settings.save_min_rating(12.0).await.unwrap(), 10.0);
    }

    let settings = open_settings(&db_path);
    assert_eq!(settings.language(), "en-EN");
    assert_eq!(settings.min_rating(), 10.0);
    assert!(settings.is_modified());
}
