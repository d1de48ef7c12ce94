//! Settings store: decoded values, durable writes, and change streams.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{
    normalize_rating, rating_is_modified, SettingsBackend, SettingsError, DEFAULT_LANGUAGE,
    DEFAULT_MIN_RATING, FAVORITES_KEY, IS_MODIFIED_KEY, LANGUAGE_KEY, MIN_RATING_KEY,
};
use crate::catalog::Item;

/// A read stream over one setting.
///
/// The first [`next`](Self::next) resolves immediately with the current
/// value; later calls wait for the next change. Returns `None` once the store
/// is gone.
#[derive(Debug, Clone)]
pub struct SettingStream<T> {
    rx: watch::Receiver<T>,
    primed: bool,
}

impl<T: Clone> SettingStream<T> {
    fn new(rx: watch::Receiver<T>) -> Self {
        Self { rx, primed: false }
    }

    /// Next value. Cancel-safe.
    pub async fn next(&mut self) -> Option<T> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Current value without consuming a change.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }
}

/// Durable settings with change notification.
///
/// Values are published to subscribers only after the backend acknowledged
/// the write. Writing an unchanged value notifies nobody.
pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
    language: watch::Sender<String>,
    min_rating: watch::Sender<f32>,
    favorites: watch::Sender<Vec<Item>>,
    is_modified: watch::Sender<bool>,
}

impl SettingsStore {
    /// Load current values from the backend.
    ///
    /// Missing keys take their defaults. Undecodable values are logged and
    /// replaced by defaults instead of failing; only backend read errors fail.
    pub fn open(backend: Arc<dyn SettingsBackend>) -> Result<Self, SettingsError> {
        let language: String = read_or(&*backend, LANGUAGE_KEY, DEFAULT_LANGUAGE.to_string())?;
        let min_rating: f32 = read_or(&*backend, MIN_RATING_KEY, DEFAULT_MIN_RATING)?;
        let favorites: Vec<Item> = read_or(&*backend, FAVORITES_KEY, Vec::new())?;
        let is_modified: bool =
            read_or(&*backend, IS_MODIFIED_KEY, rating_is_modified(min_rating))?;

        debug!(
            "Settings loaded: language={}, min_rating={}, favorites={}",
            language,
            min_rating,
            favorites.len()
        );

        Ok(Self {
            backend,
            language: watch::Sender::new(language),
            min_rating: watch::Sender::new(min_rating),
            favorites: watch::Sender::new(favorites),
            is_modified: watch::Sender::new(is_modified),
        })
    }

    pub fn language(&self) -> String {
        self.language.borrow().clone()
    }

    pub fn min_rating(&self) -> f32 {
        *self.min_rating.borrow()
    }

    pub fn favorites(&self) -> Vec<Item> {
        self.favorites.borrow().clone()
    }

    pub fn is_modified(&self) -> bool {
        *self.is_modified.borrow()
    }

    pub fn subscribe_language(&self) -> SettingStream<String> {
        SettingStream::new(self.language.subscribe())
    }

    pub fn subscribe_min_rating(&self) -> SettingStream<f32> {
        SettingStream::new(self.min_rating.subscribe())
    }

    pub fn subscribe_favorites(&self) -> SettingStream<Vec<Item>> {
        SettingStream::new(self.favorites.subscribe())
    }

    pub fn subscribe_is_modified(&self) -> SettingStream<bool> {
        SettingStream::new(self.is_modified.subscribe())
    }

    /// Persist the display language.
    pub async fn save_language(&self, language: &str) -> Result<(), SettingsError> {
        if language.is_empty() {
            return Err(SettingsError::InvalidValue {
                key: LANGUAGE_KEY.to_string(),
                reason: "language code is empty".to_string(),
            });
        }

        self.write(vec![(LANGUAGE_KEY, serde_json::to_string(language)?)])
            .await?;
        publish(&self.language, language.to_string());
        Ok(())
    }

    /// Persist the minimum rating together with the derived modified flag.
    ///
    /// Returns the value actually stored after clamping and rounding.
    pub async fn save_min_rating(&self, value: f32) -> Result<f32, SettingsError> {
        let value = normalize_rating(value)?;
        let modified = rating_is_modified(value);

        self.write(vec![
            (MIN_RATING_KEY, serde_json::to_string(&value)?),
            (IS_MODIFIED_KEY, serde_json::to_string(&modified)?),
        ])
        .await?;

        publish(&self.min_rating, value);
        publish(&self.is_modified, modified);
        Ok(value)
    }

    /// Persist the full favorite set.
    pub async fn save_favorites(&self, items: &[Item]) -> Result<(), SettingsError> {
        self.write(vec![(FAVORITES_KEY, serde_json::to_string(items)?)])
            .await?;
        publish(&self.favorites, items.to_vec());
        Ok(())
    }

    async fn write(&self, entries: Vec<(&'static str, String)>) -> Result<(), SettingsError> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || backend.put_many(&entries))
            .await
            .map_err(|e| SettingsError::Database(format!("settings write task failed: {}", e)))?
    }
}

fn publish<T: PartialEq>(tx: &watch::Sender<T>, value: T) {
    tx.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value;
        true
    });
}

fn read_or<T: DeserializeOwned>(
    backend: &dyn SettingsBackend,
    key: &str,
    default: T,
) -> Result<T, SettingsError> {
    let Some(raw) = backend.get(key)? else {
        return Ok(default);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("Ignoring unreadable setting {}: {}", key, e);
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SqliteSettingsBackend;
    use crate::testing::{fixtures, MemorySettingsBackend};

    fn open_memory() -> (Arc<MemorySettingsBackend>, SettingsStore) {
        let backend = Arc::new(MemorySettingsBackend::new());
        let store =
            SettingsStore::open(Arc::clone(&backend) as Arc<dyn SettingsBackend>).unwrap();
        (backend, store)
    }

    #[test]
    fn test_defaults_when_empty() {
        let (_, store) = open_memory();
        assert_eq!(store.language(), "ru-RU");
        assert_eq!(store.min_rating(), 1.0);
        assert!(store.favorites().is_empty());
        assert!(!store.is_modified());
    }

    #[test]
    fn test_corrupt_favorites_load_as_empty() {
        let backend = Arc::new(MemorySettingsBackend::new());
        backend.insert_raw(FAVORITES_KEY, "{not json");
        backend.insert_raw(LANGUAGE_KEY, "\"en-EN\"");

        let store = SettingsStore::open(backend as Arc<dyn SettingsBackend>).unwrap();
        assert!(store.favorites().is_empty());
        assert_eq!(store.language(), "en-EN");
    }

    #[test]
    fn test_favorite_without_title_is_kept() {
        let backend = Arc::new(MemorySettingsBackend::new());
        backend.insert_raw(
            FAVORITES_KEY,
            r#"[{"id": 3, "title": "Heat", "is_favorite": true}, {"id": 4, "is_favorite": true}]"#,
        );

        let store = SettingsStore::open(backend as Arc<dyn SettingsBackend>).unwrap();
        let favorites = store.favorites();
        assert_eq!(favorites.len(), 2);
        assert_eq!(favorites[0].title, "Heat");
        assert_eq!(favorites[1].title, crate::catalog::DEFAULT_TITLE);
    }

    #[tokio::test]
    async fn test_favorites_stream_follows_saves() {
        let (_, store) = open_memory();
        let mut stream = store.subscribe_favorites();
        assert_eq!(stream.next().await, Some(Vec::new()));

        let favorites = vec![fixtures::favorite(8, "Ronin")];
        store.save_favorites(&favorites).await.unwrap();
        assert_eq!(stream.current(), favorites);
        assert_eq!(stream.next().await, Some(favorites));
    }

    #[tokio::test]
    async fn test_subscribe_replays_current_value() {
        let (_, store) = open_memory();
        store.save_language("en-EN").await.unwrap();

        let mut stream = store.subscribe_language();
        assert_eq!(stream.next().await.as_deref(), Some("en-EN"));

        store.save_language("ru-RU").await.unwrap();
        assert_eq!(stream.next().await.as_deref(), Some("ru-RU"));
    }

    #[tokio::test]
    async fn test_unchanged_write_does_not_notify() {
        let (_, store) = open_memory();
        let mut stream = store.subscribe_language();
        assert_eq!(stream.next().await.as_deref(), Some("ru-RU"));

        store.save_language("ru-RU").await.unwrap();
        let pending =
            tokio::time::timeout(std::time::Duration::from_millis(20), stream.next()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_save_min_rating_normalizes_and_flags() {
        let (backend, store) = open_memory();
        let mut modified = store.subscribe_is_modified();
        assert_eq!(modified.next().await, Some(false));

        let stored = store.save_min_rating(7.26).await.unwrap();
        assert_eq!(stored, 7.3);
        assert_eq!(store.min_rating(), 7.3);
        assert!(store.is_modified());
        assert_eq!(modified.next().await, Some(true));
        assert_eq!(backend.raw(IS_MODIFIED_KEY).as_deref(), Some("true"));

        store.save_min_rating(1.0).await.unwrap();
        assert!(!store.is_modified());
    }

    #[tokio::test]
    async fn test_failed_write_publishes_nothing() {
        let (backend, store) = open_memory();
        backend.fail_writes(true);

        let result = store.save_language("en-EN").await;
        assert!(matches!(result, Err(SettingsError::Database(_))));
        assert_eq!(store.language(), "ru-RU");
    }

    #[tokio::test]
    async fn test_empty_language_rejected() {
        let (_, store) = open_memory();
        let result = store.save_language("").await;
        assert!(matches!(result, Err(SettingsError::InvalidValue { .. })));
    }

    #[tokio::test]
    async fn test_favorites_round_trip_through_sqlite() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("prefs.db");
        let favorites = vec![
            fixtures::favorite(11, "Alien"),
            fixtures::favorite(12, "Aliens"),
        ];

        {
            let backend = Arc::new(SqliteSettingsBackend::new(&path).unwrap());
            let store = SettingsStore::open(backend as Arc<dyn SettingsBackend>).unwrap();
            tokio_test::assert_ok!(store.save_favorites(&favorites).await);
        }

        let backend = Arc::new(SqliteSettingsBackend::new(&path).unwrap());
        let store = SettingsStore::open(backend as Arc<dyn SettingsBackend>).unwrap();
        assert_eq!(store.favorites(), favorites);
    }

    #[tokio::test]
    async fn test_stream_ends_when_store_dropped() {
        let (_, store) = open_memory();
        let mut stream = store.subscribe_min_rating();
        assert_eq!(stream.next().await, Some(1.0));

        drop(store);
        assert_eq!(stream.next().await, None);
    }
}
