//! TMDB (The Movie Database) discover client.
//!
//! TMDB requires either a v3 API key or a v4 read access token.
//! Rate limits are generous (around 40 requests per second).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{DiscoverClient, DiscoverPage, FetchError, PageRequest};
use crate::catalog::{Item, DEFAULT_TITLE};
use crate::config::TmdbConfig;
use crate::metrics;

const DEFAULT_SYNOPSIS: &str = "No description";

/// TMDB discover API client.
pub struct TmdbDiscoverClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    bearer_token: Option<String>,
}

impl TmdbDiscoverClient {
    /// Create a new TMDB client.
    pub fn new(config: &TmdbConfig) -> Result<Self, FetchError> {
        if !config.has_credentials() {
            return Err(FetchError::NotConfigured(
                "TMDB API key or bearer token is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_secs)))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            bearer_token: config.bearer_token.clone().filter(|t| !t.is_empty()),
        })
    }
}

#[async_trait]
impl DiscoverClient for TmdbDiscoverClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<DiscoverPage, FetchError> {
        let url = format!("{}/discover/movie", self.base_url);
        let query = &request.query;

        debug!(
            "TMDB discover: page={}, sort_by={}, language={}, min_rating={}",
            request.page,
            query.sort_by(),
            query.language,
            query.min_rating
        );

        let mut builder = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .query(&[
                ("include_adult", "false".to_string()),
                ("include_video", "false".to_string()),
                ("language", query.language.clone()),
                ("page", request.page.to_string()),
                ("sort_by", query.sort_by()),
                ("vote_average.gte", query.min_rating.to_string()),
            ]);

        if let Some(ref token) = self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref key) = self.api_key {
            builder = builder.query(&[("api_key", key)]);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: TmdbDiscoverResponse = response.json().await.map_err(|e| {
            FetchError::Parse(format!("Failed to parse discover response: {}", e))
        })?;

        Ok(body.into_page(request.page))
    }
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbDiscoverResponse {
    results: Vec<Value>,
    #[serde(default)]
    total_pages: Option<u32>,
}

impl TmdbDiscoverResponse {
    fn into_page(self, page: u32) -> DiscoverPage {
        let raw_count = self.results.len();
        let items: Vec<Item> = self.results.iter().filter_map(item_from_result).collect();

        let skipped = raw_count - items.len();
        if skipped > 0 {
            warn!("Skipped {} malformed discover entries on page {}", skipped, page);
            metrics::MALFORMED_ENTRIES.inc_by(skipped as u64);
        }

        DiscoverPage {
            page,
            items,
            raw_count,
            total_pages: self.total_pages,
        }
    }
}

/// Map one raw result to an [`Item`].
///
/// Only `id` is mandatory. Every other field falls back to its default when
/// absent, null or of the wrong type.
fn item_from_result(value: &Value) -> Option<Item> {
    let obj = value.as_object()?;
    let id = obj.get("id").and_then(Value::as_u64)?;

    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

    Some(Item {
        id,
        title: text("title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        release_year: text("release_date")
            .as_deref()
            .map(parse_year)
            .unwrap_or(0),
        synopsis: text("overview").unwrap_or_else(|| DEFAULT_SYNOPSIS.to_string()),
        poster_path: text("poster_path").unwrap_or_default(),
        rating: obj
            .get("vote_average")
            .and_then(Value::as_f64)
            .map(|v| (v as f32).clamp(0.0, 10.0))
            .unwrap_or(0.0),
        is_favorite: false,
    })
}

/// Year from the first four characters of a `YYYY-MM-DD` date, 0 if unparseable.
fn parse_year(date: &str) -> u32 {
    let prefix: String = date.chars().take(4).collect();
    if prefix.chars().count() < 4 {
        return 0;
    }
    prefix.parse().unwrap_or(0)
}
