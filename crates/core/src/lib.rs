pub mod catalog;
pub mod config;
pub mod discover;
pub mod engine;
pub mod metrics;
pub mod settings;
pub mod testing;

pub use catalog::{
    CatalogSnapshot, CatalogState, FavoriteSet, Item, ItemId, Query, SortDirection, SortKey,
    SORT_OPTIONS,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    EngineConfig, TmdbConfig,
};
pub use discover::{DiscoverClient, DiscoverPage, FetchError, PageRequest, TmdbDiscoverClient};
pub use engine::{EngineError, EngineHandle};
pub use settings::{
    SettingStream, SettingsBackend, SettingsError, SettingsStore, SqliteSettingsBackend,
    LANGUAGE_OPTIONS,
};
