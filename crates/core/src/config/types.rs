use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::{SortDirection, SortKey};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// TMDB discover API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    /// API base URL (default: https://api.themoviedb.org/3)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Image base URL used to build poster URLs
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,
    /// v3 API key, sent as the `api_key` query parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// v4 read access token, sent as `Authorization: Bearer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Number of results the API returns per full page (default: 20)
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl TmdbConfig {
    /// Config pointing at `base_url` with a bearer token and defaults elsewhere.
    pub fn with_token(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            image_base_url: default_image_base_url(),
            api_key: None,
            bearer_token: Some(token.into()),
            timeout_secs: default_timeout(),
            page_size: default_page_size(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        set(&self.api_key) || set(&self.bearer_token)
    }
}

fn default_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_image_base_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_page_size() -> usize {
    20
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("cinelist.db")
}

/// Sync engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// How long a favorite toggle suppresses refetches and pagination (milliseconds).
    #[serde(default = "default_guard_window")]
    pub guard_window_ms: u64,

    /// Capacity of the command channel feeding the engine.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,

    /// Sort key used for the first query.
    #[serde(default)]
    pub default_sort_key: SortKey,

    /// Sort direction used for the first query.
    #[serde(default)]
    pub default_direction: SortDirection,
}

fn default_guard_window() -> u64 {
    1000
}

fn default_command_buffer() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            guard_window_ms: default_guard_window(),
            command_buffer: default_command_buffer(),
            default_sort_key: SortKey::default(),
            default_direction: SortDirection::default(),
        }
    }
}
