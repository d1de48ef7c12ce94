//! Testing utilities and mock implementations.
//!
//! Mocks for the two seams the engine talks through: the discover API and the
//! settings backend. Both record what they were asked and can be told to fail.
//!
//! # Example
//!
//! ```rust,ignore
//! use cinelist_core::testing::{fixtures, MockDiscoverClient};
//!
//! let client = MockDiscoverClient::new();
//! client.set_page(1, fixtures::items(&[1, 2])).await;
//! client.set_latency(Duration::from_millis(50)).await;
//! ```

mod memory_settings;
mod mock_discover_client;

pub use memory_settings::MemorySettingsBackend;
pub use mock_discover_client::{MockDiscoverClient, RecordedFetch};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::{Item, ItemId, Query, SortDirection, SortKey};

    /// An item with plausible defaults.
    pub fn item(id: ItemId) -> Item {
        Item {
            id,
            title: format!("Movie {}", id),
            release_year: 2000 + (id % 25) as u32,
            synopsis: format!("Synopsis of movie {}.", id),
            poster_path: format!("/poster{}.jpg", id),
            rating: 7.0,
            is_favorite: false,
        }
    }

    /// Items for the given IDs, in order.
    pub fn items(ids: &[ItemId]) -> Vec<Item> {
        ids.iter().copied().map(item).collect()
    }

    /// An item already flagged as favorite.
    pub fn favorite(id: ItemId, title: &str) -> Item {
        Item {
            title: title.to_string(),
            is_favorite: true,
            ..item(id)
        }
    }

    /// The query an engine starts with on empty settings.
    pub fn default_query() -> Query {
        Query::new(SortKey::Popularity, SortDirection::Desc, "ru-RU", 1.0)
    }
}
