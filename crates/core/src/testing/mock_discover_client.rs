//! Mock discover client for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::catalog::{Item, Query};
use crate::discover::{DiscoverClient, DiscoverPage, FetchError, PageRequest};

/// A fetch the mock received.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    pub page: u32,
    pub query: Query,
    /// When the request arrived (tokio clock, so paused time works).
    pub at: Instant,
}

#[derive(Debug)]
struct ScriptedResponse {
    delay: Duration,
    result: Result<Vec<Item>, FetchError>,
}

/// Mock implementation of the DiscoverClient trait.
///
/// Provides controllable behavior for testing:
/// - Serve configured items per page number (unknown pages come back empty)
/// - Queue one-shot responses with their own delay, consumed in request order
/// - Add latency to every request
/// - Track requests for assertions
/// - Simulate failures
#[derive(Debug, Default)]
pub struct MockDiscoverClient {
    pages: Arc<RwLock<HashMap<u32, Vec<Item>>>>,
    total_pages: Arc<RwLock<Option<u32>>>,
    scripted: Arc<RwLock<VecDeque<ScriptedResponse>>>,
    latency: Arc<RwLock<Duration>>,
    requests: Arc<RwLock<Vec<RecordedFetch>>>,
    next_error: Arc<RwLock<Option<FetchError>>>,
}

impl MockDiscoverClient {
    /// Create a mock that answers every page with an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Response Configuration
    // =========================================================================

    /// Serve `items` for `page` from now on.
    pub async fn set_page(&self, page: u32, items: Vec<Item>) {
        self.pages.write().await.insert(page, items);
    }

    /// Report this total page count on every response.
    pub async fn set_total_pages(&self, total: Option<u32>) {
        *self.total_pages.write().await = total;
    }

    /// Answer the next unscripted request with `items` after `delay`.
    pub async fn push_response(&self, delay: Duration, items: Vec<Item>) {
        self.scripted.write().await.push_back(ScriptedResponse {
            delay,
            result: Ok(items),
        });
    }

    /// Answer the next unscripted request with `error` after `delay`.
    pub async fn push_error(&self, delay: Duration, error: FetchError) {
        self.scripted.write().await.push_back(ScriptedResponse {
            delay,
            result: Err(error),
        });
    }

    /// Delay applied to requests served from the page table.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    // =========================================================================
    // Query Inspection
    // =========================================================================

    /// Get all recorded requests.
    pub async fn recorded_requests(&self) -> Vec<RecordedFetch> {
        self.requests.read().await.clone()
    }

    /// Get the number of requests received.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Clear recorded requests.
    pub async fn clear_recorded(&self) {
        self.requests.write().await.clear();
    }

    // =========================================================================
    // Error Injection
    // =========================================================================

    /// Set an error to be returned on the next request.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    async fn take_error(&self) -> Option<FetchError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl DiscoverClient for MockDiscoverClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<DiscoverPage, FetchError> {
        self.requests.write().await.push(RecordedFetch {
            page: request.page,
            query: request.query.clone(),
            at: Instant::now(),
        });

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let scripted = self.scripted.write().await.pop_front();
        let (delay, result) = match scripted {
            Some(response) => (response.delay, response.result),
            None => {
                let items = self
                    .pages
                    .read()
                    .await
                    .get(&request.page)
                    .cloned()
                    .unwrap_or_default();
                (*self.latency.read().await, Ok(items))
            }
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let items = result?;
        let mut page = DiscoverPage::from_items(request.page, items);
        page.total_pages = *self.total_pages.read().await;
        Ok(page)
    }
}
