//! Remote discover API access.
//!
//! The engine only sees the [`DiscoverClient`] trait: given a page number and
//! a [`Query`] it gets back a [`DiscoverPage`] or a [`FetchError`]. Transport,
//! authentication and payload parsing stay behind the trait.

mod tmdb;

pub use tmdb::TmdbDiscoverClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Item, Query};

/// Errors that can occur when fetching a discover page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure (connection, TLS, timeout).
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a non-success status.
    #[error("API Error: {status}")]
    Api { status: u16, message: String },

    /// Payload was not a discover response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Client not configured (missing credentials, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl FetchError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Api { .. } => "api",
            Self::Parse(_) => "parse",
            Self::NotConfigured(_) => "not_configured",
        }
    }
}

/// A single page request: the page number plus the query it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub query: Query,
}

impl PageRequest {
    pub fn new(page: u32, query: Query) -> Self {
        Self { page, query }
    }
}

/// One page of discover results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiscoverPage {
    /// Page number this result answers.
    pub page: u32,
    /// Items that parsed successfully, in server rank order.
    pub items: Vec<Item>,
    /// Number of raw entries in the payload, including skipped ones.
    pub raw_count: usize,
    /// Total pages reported by the server, if any.
    pub total_pages: Option<u32>,
}

impl DiscoverPage {
    /// A page made only of well-formed items.
    pub fn from_items(page: u32, items: Vec<Item>) -> Self {
        Self {
            page,
            raw_count: items.len(),
            items,
            total_pages: None,
        }
    }

    pub fn skipped(&self) -> usize {
        self.raw_count.saturating_sub(self.items.len())
    }

    /// Whether no page follows this one.
    ///
    /// Empty and partial pages end the collection, as does reaching the
    /// server-reported page count.
    pub fn is_last(&self, page_size: usize) -> bool {
        self.raw_count == 0
            || self.raw_count < page_size
            || self.total_pages.is_some_and(|total| self.page >= total)
    }
}

/// Trait for discover API clients.
#[async_trait]
pub trait DiscoverClient: Send + Sync {
    /// Fetch one page of results for the given query.
    async fn fetch_page(&self, request: &PageRequest) -> Result<DiscoverPage, FetchError>;
}
