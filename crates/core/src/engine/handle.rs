use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::info;

use super::guard::GuardWindow;
use super::runner::EngineRunner;
use super::types::{EngineCommand, EngineError};
use super::writer::create_favorites_writer;
use crate::catalog::{
    CatalogSnapshot, CatalogState, FavoriteSet, ItemId, Query, SortDirection, SortKey,
};
use crate::config::EngineConfig;
use crate::discover::DiscoverClient;
use crate::settings::SettingsStore;

/// Handle to a running catalog engine.
///
/// Cheap to clone. Every command waits until the engine loop has processed
/// it, so a snapshot read afterwards reflects the command.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
    snapshots: watch::Receiver<CatalogSnapshot>,
    shutdown_tx: broadcast::Sender<()>,
}

impl EngineHandle {
    /// Start the engine loop and its favorites writer on the current runtime.
    ///
    /// The first query is built from the settings' current values, and the
    /// favorite set is loaded from them once. The first page fetch starts
    /// immediately.
    pub fn spawn(
        config: &EngineConfig,
        page_size: usize,
        client: Arc<dyn DiscoverClient>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        let query = Query::new(
            config.default_sort_key,
            config.default_direction,
            settings.language(),
            settings.min_rating(),
        );
        let favorites = FavoriteSet::from_items(settings.favorites());
        info!("Restored {} favorites", favorites.len());

        let state = CatalogState::new(query, favorites);
        let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot(false));
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        let (results_tx, results_rx) = mpsc::channel(config.command_buffer);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let (favorites_handle, writer) =
            create_favorites_writer(Arc::clone(&settings), settings.favorites());
        let writer_task = tokio::spawn(writer.run());

        let runner = EngineRunner {
            state,
            guard: GuardWindow::new(Duration::from_millis(config.guard_window_ms)),
            page_size,
            client,
            commands: command_rx,
            results_tx,
            results_rx,
            snapshots: snapshot_tx,
            favorites: favorites_handle,
            writer_task,
            language: settings.subscribe_language(),
            min_rating: settings.subscribe_min_rating(),
            shutdown_rx,
        };
        tokio::spawn(runner.run());

        Self {
            commands: command_tx,
            snapshots: snapshot_rx,
            shutdown_tx,
        }
    }

    /// Change sort key and direction. Restarts from page 1 unless unchanged.
    pub async fn set_filter(
        &self,
        sort_key: SortKey,
        direction: SortDirection,
    ) -> Result<(), EngineError> {
        self.request(|reply| EngineCommand::SetFilter {
            sort_key,
            direction,
            reply,
        })
        .await
    }

    /// Request the next page. Returns whether a fetch was issued.
    pub async fn load_next_page(&self) -> Result<bool, EngineError> {
        self.request(|reply| EngineCommand::LoadNextPage { reply })
            .await
    }

    /// Flip the favorite flag of `id`.
    ///
    /// Returns the new flag, or `None` if the item is neither listed nor a
    /// favorite.
    pub async fn toggle_favorite(&self, id: ItemId) -> Result<Option<bool>, EngineError> {
        self.request(|reply| EngineCommand::ToggleFavorite { id, reply })
            .await
    }

    /// Latest published state.
    pub fn snapshot(&self) -> CatalogSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<CatalogSnapshot> {
        self.snapshots.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Stop the engine and wait for queued favorite writes to finish.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        self.commands.closed().await;
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| EngineError::Closed)?;
        response.await.map_err(|_| EngineError::Closed)
    }
}
