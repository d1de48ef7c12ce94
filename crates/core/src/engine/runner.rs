//! The engine owner loop.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::guard::GuardWindow;
use super::types::{EngineCommand, FetchKind, FetchOutcome};
use super::writer::FavoritesHandle;
use crate::catalog::{CatalogSnapshot, CatalogState, ItemId, Query, SortDirection, SortKey};
use crate::discover::{DiscoverClient, PageRequest};
use crate::metrics;
use crate::settings::SettingStream;

/// Owns the catalog state and every channel feeding it.
pub(crate) struct EngineRunner {
    pub state: CatalogState,
    pub guard: GuardWindow,
    pub page_size: usize,
    pub client: Arc<dyn DiscoverClient>,
    pub commands: mpsc::Receiver<EngineCommand>,
    pub results_tx: mpsc::Sender<FetchOutcome>,
    pub results_rx: mpsc::Receiver<FetchOutcome>,
    pub snapshots: watch::Sender<CatalogSnapshot>,
    pub favorites: FavoritesHandle,
    pub writer_task: JoinHandle<()>,
    pub language: SettingStream<String>,
    pub min_rating: SettingStream<f32>,
    pub shutdown_rx: broadcast::Receiver<()>,
}

impl EngineRunner {
    /// Run until shutdown or until every handle is gone.
    pub async fn run(mut self) {
        info!(
            "Catalog engine started (query: {}, language: {}, min_rating: {})",
            self.state.query().sort_by(),
            self.state.query().language,
            self.state.query().min_rating
        );

        self.init_fetch();

        let mut language_open = true;
        let mut rating_open = true;

        loop {
            let deadline = self.guard.deadline();

            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Catalog engine received shutdown signal");
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("All engine handles dropped");
                        break;
                    }
                },
                Some(outcome) = self.results_rx.recv() => self.apply_outcome(outcome),
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.close_guard();
                }
                value = self.language.next(), if language_open => match value {
                    Some(language) => self.on_language(language),
                    None => {
                        warn!("Language stream closed");
                        language_open = false;
                    }
                },
                value = self.min_rating.next(), if rating_open => match value {
                    Some(min_rating) => self.on_min_rating(min_rating),
                    None => {
                        warn!("Rating stream closed");
                        rating_open = false;
                    }
                },
            }
        }

        let Self {
            favorites,
            writer_task,
            ..
        } = self;
        drop(favorites);
        if let Err(e) = writer_task.await {
            error!("Favorites writer task failed: {}", e);
        }

        info!("Catalog engine stopped");
    }

    fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::SetFilter {
                sort_key,
                direction,
                reply,
            } => {
                self.set_filter(sort_key, direction);
                let _ = reply.send(());
            }
            EngineCommand::LoadNextPage { reply } => {
                let issued = self.load_next_page();
                let _ = reply.send(issued);
            }
            EngineCommand::ToggleFavorite { id, reply } => {
                let outcome = self.toggle_favorite(id);
                let _ = reply.send(outcome);
            }
        }
    }

    fn set_filter(&mut self, sort_key: SortKey, direction: SortDirection) {
        let query = self.state.query().with_sort(sort_key, direction);
        if query == *self.state.query() {
            debug!("Filter unchanged ({}), ignoring", query.sort_by());
            return;
        }
        self.change_query(query);
    }

    fn on_language(&mut self, language: String) {
        if language == self.state.query().language {
            return;
        }
        info!("Language changed to {}", language);
        let query = self.state.query().with_language(language);
        self.change_query(query);
    }

    fn on_min_rating(&mut self, min_rating: f32) {
        if min_rating == self.state.query().min_rating {
            return;
        }
        info!("Minimum rating changed to {}", min_rating);
        let query = self.state.query().with_min_rating(min_rating);
        self.change_query(query);
    }

    /// Install a new query. The restart waits for the guard window if one is open.
    fn change_query(&mut self, query: Query) {
        self.state.replace_query(query);
        self.init_fetch();
    }

    /// Restart from page 1 under the current query.
    fn init_fetch(&mut self) {
        if self.guard.is_active() {
            self.guard.defer_restart();
            debug!(
                "Restart for {} deferred until guard window closes",
                self.state.query().sort_by()
            );
            self.publish();
            return;
        }

        let epoch = self.state.begin_restart();
        self.spawn_fetch(epoch, FetchKind::Restart, 1);
        self.publish();
    }

    fn load_next_page(&mut self) -> bool {
        if self.guard.is_active() {
            debug!("Next page ignored: guard window open");
            metrics::PAGINATION_REJECTED
                .with_label_values(&["guarded"])
                .inc();
            return false;
        }

        let Some((epoch, page)) = self.state.begin_next_page() else {
            let reason = if self.state.is_loading() {
                "loading"
            } else {
                "exhausted"
            };
            debug!("Next page ignored: {}", reason);
            metrics::PAGINATION_REJECTED
                .with_label_values(&[reason])
                .inc();
            return false;
        };

        self.spawn_fetch(epoch, FetchKind::NextPage, page);
        self.publish();
        true
    }

    fn toggle_favorite(&mut self, id: ItemId) -> Option<bool> {
        let Some(outcome) = self.state.toggle_favorite(id) else {
            warn!("Toggle ignored: item {} is neither listed nor a favorite", id);
            return None;
        };

        let action = if outcome.is_favorite {
            "added"
        } else {
            "removed"
        };
        debug!("Favorite {} {}", id, action);
        metrics::FAVORITE_TOGGLES.with_label_values(&[action]).inc();

        self.guard.arm(Instant::now());
        self.publish();
        self.favorites.save(self.state.favorites().to_vec());

        Some(outcome.is_favorite)
    }

    fn close_guard(&mut self) {
        let restart = self.guard.expire(Instant::now());
        if !self.guard.is_active() {
            debug!("Guard window closed (pending restart: {})", restart);
        }
        if restart {
            self.init_fetch();
        } else {
            self.publish();
        }
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome) {
        if !self.state.is_current(outcome.epoch) {
            debug!(
                "Dropping stale {} result for page {} (epoch {}, current {})",
                outcome.kind.as_str(),
                outcome.page,
                outcome.epoch,
                self.state.epoch()
            );
            metrics::STALE_RESULTS_DROPPED.inc();
            return;
        }

        match outcome.result {
            Ok(page) => {
                let end_of_collection = page.is_last(self.page_size);
                debug!(
                    "Applying page {} ({} items, last: {})",
                    outcome.page,
                    page.items.len(),
                    end_of_collection
                );
                metrics::FETCHES_TOTAL
                    .with_label_values(&[outcome.kind.as_str(), "ok"])
                    .inc();
                self.state
                    .apply_page(outcome.page, page.items, end_of_collection);
            }
            Err(e) => {
                warn!("Fetch of page {} failed: {}", outcome.page, e);
                metrics::FETCHES_TOTAL
                    .with_label_values(&[outcome.kind.as_str(), e.kind()])
                    .inc();
                self.state.apply_failure(e.to_string());
            }
        }

        self.publish();
    }

    fn spawn_fetch(&self, epoch: u64, kind: FetchKind, page: u32) {
        let request = PageRequest::new(page, self.state.query().clone());
        let client = Arc::clone(&self.client);
        let tx = self.results_tx.clone();

        debug!(
            "Fetching page {} for {} (epoch {})",
            page,
            request.query.sort_by(),
            epoch
        );

        tokio::spawn(async move {
            let result = client.fetch_page(&request).await;
            let _ = tx
                .send(FetchOutcome {
                    epoch,
                    kind,
                    page,
                    result,
                })
                .await;
        });
    }

    fn publish(&self) {
        debug_assert!(
            self.state.invariant_violations().is_empty(),
            "catalog invariants broken: {:?}",
            self.state.invariant_violations()
        );

        let snapshot = self.state.snapshot(self.guard.is_active());
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}
