use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::catalog::Item;
use crate::metrics;
use crate::settings::SettingsStore;

/// Latest-value slot feeding the favorites writer.
///
/// Publishing never waits on the writer: a set handed over while a write is
/// in progress replaces any set still waiting.
pub(crate) struct FavoritesHandle {
    tx: watch::Sender<Vec<Item>>,
}

impl FavoritesHandle {
    /// Hand the full favorite set to the writer.
    pub fn save(&self, favorites: Vec<Item>) {
        self.tx.send_replace(favorites);
    }
}

/// Background task writing the newest favorite set.
pub(crate) struct FavoritesWriter {
    rx: watch::Receiver<Vec<Item>>,
    settings: Arc<SettingsStore>,
    last_written: Vec<Item>,
}

impl FavoritesWriter {
    /// Run until the handle is dropped, then write whatever is still pending.
    pub async fn run(mut self) {
        debug!("Favorites writer started");

        while self.rx.changed().await.is_ok() {
            let favorites = self.rx.borrow_and_update().clone();
            self.write(favorites).await;
        }

        // A failed final write gets one more attempt.
        let favorites = self.rx.borrow().clone();
        self.write(favorites).await;

        info!("Favorites writer shutting down");
    }

    async fn write(&mut self, favorites: Vec<Item>) {
        if favorites == self.last_written {
            return;
        }

        match self.settings.save_favorites(&favorites).await {
            Ok(()) => {
                debug!("Persisted {} favorites", favorites.len());
                self.last_written = favorites;
            }
            Err(e) => {
                error!("Failed to persist favorites: {}", e);
                metrics::PERSIST_FAILURES.inc();
            }
        }
    }
}

/// Create a writer whose baseline is the favorite set already stored.
pub(crate) fn create_favorites_writer(
    settings: Arc<SettingsStore>,
    stored: Vec<Item>,
) -> (FavoritesHandle, FavoritesWriter) {
    let (tx, rx) = watch::channel(stored.clone());
    (
        FavoritesHandle { tx },
        FavoritesWriter {
            rx,
            settings,
            last_written: stored,
        },
    )
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::settings::SettingsBackend;
    use crate::testing::{fixtures, MemorySettingsBackend};

    fn store(backend: &Arc<MemorySettingsBackend>) -> Arc<SettingsStore> {
        let backend = Arc::clone(backend) as Arc<dyn SettingsBackend>;
        Arc::new(SettingsStore::open(backend).unwrap())
    }

    #[tokio::test]
    async fn test_last_saved_set_wins() {
        let backend = Arc::new(MemorySettingsBackend::new());
        let settings = store(&backend);
        let (handle, writer) = create_favorites_writer(Arc::clone(&settings), Vec::new());

        handle.save(vec![fixtures::favorite(1, "One")]);
        handle.save(vec![fixtures::favorite(1, "One"), fixtures::favorite(2, "Two")]);
        handle.save(vec![fixtures::favorite(2, "Two")]);
        drop(handle);

        writer.run().await;

        let ids: Vec<_> = settings.favorites().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_set_is_not_rewritten() {
        let backend = Arc::new(MemorySettingsBackend::new());
        let settings = store(&backend);
        let stored = vec![fixtures::favorite(5, "Five")];
        let (handle, writer) = create_favorites_writer(Arc::clone(&settings), stored.clone());

        handle.save(stored);
        drop(handle);
        writer.run().await;

        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_running() {
        let backend = Arc::new(MemorySettingsBackend::new());
        let settings = store(&backend);
        let (handle, writer) = create_favorites_writer(Arc::clone(&settings), Vec::new());
        let task = tokio::spawn(writer.run());

        backend.fail_writes(true);
        handle.save(vec![fixtures::favorite(1, "One")]);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(settings.favorites().is_empty());

        backend.fail_writes(false);
        handle.save(vec![fixtures::favorite(3, "Three")]);
        drop(handle);
        task.await.unwrap();

        assert_eq!(settings.favorites()[0].id, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_save_does_not_wait_for_slow_write() {
        let backend = Arc::new(MemorySettingsBackend::new());
        backend.set_write_delay(Duration::from_millis(500));
        let settings = store(&backend);
        let (handle, writer) = create_favorites_writer(Arc::clone(&settings), Vec::new());
        let task = tokio::spawn(writer.run());

        let started = Instant::now();
        for id in 0..50 {
            handle.save(vec![fixtures::favorite(id, "Any")]);
            tokio::task::yield_now().await;
        }
        assert!(started.elapsed() < Duration::from_millis(250));

        drop(handle);
        task.await.unwrap();

        assert_eq!(settings.favorites()[0].id, 49);
        assert!(backend.write_count() <= 2);
    }
}
