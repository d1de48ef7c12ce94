//! The authoritative catalog state owned by the sync engine.

use std::collections::HashSet;

use serde::Serialize;

use super::types::{FavoriteSet, Item, ItemId, Query};

/// Mutable catalog state. Only the engine loop holds one of these.
#[derive(Debug, Clone)]
pub struct CatalogState {
    items: Vec<Item>,
    page: u32,
    query: Query,
    loading: bool,
    error: Option<String>,
    favorites: FavoriteSet,
    exhausted: bool,
    epoch: u64,
}

/// Immutable view of the catalog handed to readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSnapshot {
    pub items: Vec<Item>,
    /// Last successfully loaded page (0 before the first load).
    pub page: u32,
    pub query: Query,
    pub loading: bool,
    pub error: Option<String>,
    pub favorites: Vec<Item>,
    /// No further pages exist for the current query.
    pub exhausted: bool,
    /// A favorite toggle guard window is open.
    pub guarded: bool,
}

impl CatalogSnapshot {
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|i| i.id).collect()
    }

    pub fn favorite_ids(&self) -> Vec<ItemId> {
        self.favorites.iter().map(|i| i.id).collect()
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }
}

/// Result of flipping an item's favorite flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub id: ItemId,
    pub is_favorite: bool,
}

impl CatalogState {
    pub fn new(query: Query, favorites: FavoriteSet) -> Self {
        Self {
            items: Vec::new(),
            page: 0,
            query,
            loading: false,
            error: None,
            favorites,
            exhausted: false,
            epoch: 0,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn favorites(&self) -> &FavoriteSet {
        &self.favorites
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    pub fn snapshot(&self, guarded: bool) -> CatalogSnapshot {
        CatalogSnapshot {
            items: self.items.clone(),
            page: self.page,
            query: self.query.clone(),
            loading: self.loading,
            error: self.error.clone(),
            favorites: self.favorites.to_vec(),
            exhausted: self.exhausted,
            guarded,
        }
    }

    /// Replace the query and invalidate any fetch in flight.
    ///
    /// Items and page are left alone; the caller follows up with
    /// [`begin_restart`](Self::begin_restart) once it is allowed to fetch.
    pub fn replace_query(&mut self, query: Query) {
        self.query = query;
        self.epoch += 1;
        self.loading = false;
    }

    /// Reset to an empty first-page load and return the epoch for the fetch.
    pub fn begin_restart(&mut self) -> u64 {
        self.epoch += 1;
        self.items.clear();
        self.page = 0;
        self.loading = true;
        self.error = None;
        self.exhausted = false;
        self.epoch
    }

    /// Reserve the next page fetch. Returns `(epoch, page)` or `None` when a
    /// fetch is already running or the collection is exhausted.
    pub fn begin_next_page(&mut self) -> Option<(u64, u32)> {
        if self.loading || self.exhausted {
            return None;
        }
        self.epoch += 1;
        self.loading = true;
        Some((self.epoch, self.page + 1))
    }

    /// Apply a successful fetch of `page`.
    ///
    /// Page 1 replaces the list, later pages append. IDs already present are
    /// skipped. An empty result leaves items and page untouched.
    pub fn apply_page(&mut self, page: u32, items: Vec<Item>, end_of_collection: bool) {
        self.loading = false;
        self.error = None;

        if end_of_collection {
            self.exhausted = true;
        }
        if items.is_empty() {
            return;
        }

        if page <= 1 {
            self.items.clear();
        }

        let mut seen: HashSet<ItemId> = self.items.iter().map(|i| i.id).collect();
        for mut item in items {
            if !seen.insert(item.id) {
                continue;
            }
            item.is_favorite = self.favorites.contains(item.id);
            if item.is_favorite {
                self.favorites.refresh(&item);
            }
            self.items.push(item);
        }

        self.page = page;
    }

    /// Record a failed fetch. Loaded pages stay as they are.
    pub fn apply_failure(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    /// Flip the favorite flag of `id` in both the list and the favorite set.
    ///
    /// The item is looked up in the list first, then in the favorite set.
    /// Returns `None` when the ID is in neither.
    pub fn toggle_favorite(&mut self, id: ItemId) -> Option<ToggleOutcome> {
        if self.favorites.contains(id) {
            self.favorites.remove(id);
            if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
                item.is_favorite = false;
            }
            return Some(ToggleOutcome {
                id,
                is_favorite: false,
            });
        }

        let item = self.items.iter_mut().find(|i| i.id == id)?;
        item.is_favorite = true;
        self.favorites.insert(item.clone());
        Some(ToggleOutcome {
            id,
            is_favorite: true,
        })
    }

    /// Describe every broken invariant; empty when the state is consistent.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        let mut seen = HashSet::new();
        for item in &self.items {
            if !seen.insert(item.id) {
                violations.push(format!("duplicate item id {}", item.id));
            }
            if item.is_favorite != self.favorites.contains(item.id) {
                violations.push(format!(
                    "item {} has is_favorite={} but favorite membership disagrees",
                    item.id, item.is_favorite
                ));
            }
        }

        for fav in self.favorites.iter() {
            if !fav.is_favorite {
                violations.push(format!("favorite {} stored without flag", fav.id));
            }
        }

        if self.page == 0 && !self.items.is_empty() {
            violations.push("items present before any page loaded".to_string());
        }

        violations
    }
}
