//! Durable user settings with replay-on-subscribe read streams.
//!
//! A [`SettingsBackend`] persists raw key/value pairs. The [`SettingsStore`]
//! sits on top, decodes values, and republishes every successful write to
//! subscribers through [`SettingStream`]s.

mod sqlite;
mod store;

pub use sqlite::SqliteSettingsBackend;
pub use store::{SettingStream, SettingsStore};

use thiserror::Error;

/// Key holding the display language code.
pub const LANGUAGE_KEY: &str = "language";
/// Key holding the minimum rating threshold.
pub const MIN_RATING_KEY: &str = "min_rating";
/// Key holding the JSON list of favorite items.
pub const FAVORITES_KEY: &str = "favorite_items";
/// Key holding the derived "rating differs from default" flag.
pub const IS_MODIFIED_KEY: &str = "is_modified";

pub const DEFAULT_LANGUAGE: &str = "ru-RU";
pub const DEFAULT_MIN_RATING: f32 = 1.0;

/// Languages offered on the settings screen: `(code, label)`.
pub const LANGUAGE_OPTIONS: [(&str, &str); 2] = [("ru-RU", "Русский"), ("en-EN", "Английский")];

/// Errors from settings persistence.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Raw key/value persistence for settings.
///
/// Values are JSON text. `put_many` must apply all entries or none.
pub trait SettingsBackend: Send + Sync {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;

    /// Write several entries atomically.
    fn put_many(&self, entries: &[(&str, String)]) -> Result<(), SettingsError>;
}

/// Clamp a rating to `[0, 10]` and round it to the slider's 0.1 step.
pub fn normalize_rating(value: f32) -> Result<f32, SettingsError> {
    if !value.is_finite() {
        return Err(SettingsError::InvalidValue {
            key: MIN_RATING_KEY.to_string(),
            reason: format!("{} is not a finite number", value),
        });
    }
    Ok(((value.clamp(0.0, 10.0)) * 10.0).round() / 10.0)
}

/// Whether a rating differs from the default threshold.
pub fn rating_is_modified(value: f32) -> bool {
    (value - DEFAULT_MIN_RATING).abs() > f32::EPSILON
}

/// Display label for a language code, if it is one of the offered options.
pub fn language_label(code: &str) -> Option<&'static str> {
    LANGUAGE_OPTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
}
