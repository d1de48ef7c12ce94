//! Types for the catalog: items, queries and the favorite set.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Title shown when the upstream or stored entry has none.
pub const DEFAULT_TITLE: &str = "Unknown";

/// Stable upstream identifier of a catalog item.
pub type ItemId = u64;

/// A catalog entry as shown in the list and on the favorites screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Upstream ID, unique and stable across pages.
    pub id: ItemId,
    /// Display title.
    #[serde(default = "default_title")]
    pub title: String,
    /// Release year (0 when unknown).
    #[serde(default)]
    pub release_year: u32,
    /// Short description.
    #[serde(default)]
    pub synopsis: String,
    /// Poster path relative to the image base URL (empty when absent).
    #[serde(default)]
    pub poster_path: String,
    /// Average rating (0-10).
    #[serde(default)]
    pub rating: f32,
    /// Whether the item is in the favorite set.
    #[serde(default)]
    pub is_favorite: bool,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl Item {
    /// Full poster URL, or `None` when the item has no poster.
    pub fn poster_url(&self, image_base_url: &str) -> Option<String> {
        if self.poster_path.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}",
            image_base_url.trim_end_matches('/'),
            self.poster_path.trim_start_matches('/')
        ))
    }
}

/// Sort keys accepted by the discover endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Popularity,
    Revenue,
    Title,
    OriginalTitle,
    PrimaryReleaseDate,
    VoteAverage,
    VoteCount,
}

/// Every sort key in the order the filter menu lists them.
pub const SORT_OPTIONS: [SortKey; 7] = [
    SortKey::Popularity,
    SortKey::OriginalTitle,
    SortKey::Revenue,
    SortKey::Title,
    SortKey::PrimaryReleaseDate,
    SortKey::VoteAverage,
    SortKey::VoteCount,
];

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Popularity => "popularity",
            Self::Revenue => "revenue",
            Self::Title => "title",
            Self::OriginalTitle => "original_title",
            Self::PrimaryReleaseDate => "primary_release_date",
            Self::VoteAverage => "vote_average",
            Self::VoteCount => "vote_count",
        }
    }

    /// Menu label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Popularity => "Популярность",
            Self::Revenue => "Выручка",
            Self::Title => "Название",
            Self::OriginalTitle => "Оригинальное название",
            Self::PrimaryReleaseDate => "Дата релиза",
            Self::VoteAverage => "Средняя оценка",
            Self::VoteCount => "Количество голосов",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Asc => "По возрастанию",
            Self::Desc => "По убыванию",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that determines a discover request apart from the page number.
///
/// Queries are replaced wholesale; the engine never patches a single field in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub sort_key: SortKey,
    pub direction: SortDirection,
    pub language: String,
    pub min_rating: f32,
}

impl Query {
    pub fn new(
        sort_key: SortKey,
        direction: SortDirection,
        language: impl Into<String>,
        min_rating: f32,
    ) -> Self {
        Self {
            sort_key,
            direction,
            language: language.into(),
            min_rating,
        }
    }

    /// The `sort_by` parameter, e.g. `popularity.desc`.
    pub fn sort_by(&self) -> String {
        format!("{}.{}", self.sort_key, self.direction)
    }

    pub fn with_sort(&self, sort_key: SortKey, direction: SortDirection) -> Self {
        Self {
            sort_key,
            direction,
            ..self.clone()
        }
    }

    pub fn with_language(&self, language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..self.clone()
        }
    }

    pub fn with_min_rating(&self, min_rating: f32) -> Self {
        Self {
            min_rating,
            ..self.clone()
        }
    }
}

/// Favorite items keyed by ID, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoriteSet {
    items: Vec<Item>,
}

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted items, dropping repeated IDs and forcing the favorite flag.
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut set = Self::new();
        for item in items {
            set.insert(item);
        }
        set
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Insert an item; returns false if the ID was already present.
    pub fn insert(&mut self, mut item: Item) -> bool {
        if self.contains(item.id) {
            return false;
        }
        item.is_favorite = true;
        self.items.push(item);
        true
    }

    /// Remove by ID, returning the removed item.
    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        let idx = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(idx))
    }

    /// Replace the stored fields of an existing favorite with fresher ones.
    pub fn refresh(&mut self, item: &Item) {
        if let Some(stored) = self.items.iter_mut().find(|i| i.id == item.id) {
            *stored = Item {
                is_favorite: true,
                ..item.clone()
            };
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|i| i.id).collect()
    }

    pub fn to_vec(&self) -> Vec<Item> {
        self.items.clone()
    }
}
