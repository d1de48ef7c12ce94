//! SQLite-backed settings persistence.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{SettingsBackend, SettingsError};

/// SQLite-backed settings backend.
pub struct SqliteSettingsBackend {
    conn: Mutex<Connection>,
}

impl SqliteSettingsBackend {
    /// Open the database file, creating it and the table if needed.
    pub fn new(path: &Path) -> Result<Self, SettingsError> {
        let conn = Connection::open(path).map_err(|e| SettingsError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite backend (useful for testing).
    pub fn in_memory() -> Result<Self, SettingsError> {
        let conn =
            Connection::open_in_memory().map_err(|e| SettingsError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), SettingsError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| SettingsError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SettingsError> {
        self.conn
            .lock()
            .map_err(|_| SettingsError::Database("connection mutex poisoned".to_string()))
    }
}

impl SettingsBackend for SqliteSettingsBackend {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM preferences WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| SettingsError::Database(e.to_string()))
    }

    fn put_many(&self, entries: &[(&str, String)]) -> Result<(), SettingsError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| SettingsError::Database(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )
            .map_err(|e| SettingsError::Database(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| SettingsError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_missing_key() {
        let backend = SqliteSettingsBackend::in_memory().unwrap();
        assert!(backend.get("language").unwrap().is_none());
    }

    #[test]
    fn test_put_and_overwrite() {
        let backend = SqliteSettingsBackend::in_memory().unwrap();
        backend
            .put_many(&[("language", "\"en-EN\"".to_string())])
            .unwrap();
        backend
            .put_many(&[("language", "\"ru-RU\"".to_string())])
            .unwrap();

        assert_eq!(
            backend.get("language").unwrap().as_deref(),
            Some("\"ru-RU\"")
        );
    }

    #[test]
    fn test_put_many_writes_all_entries() {
        let backend = SqliteSettingsBackend::in_memory().unwrap();
        backend
            .put_many(&[
                ("min_rating", "6.5".to_string()),
                ("is_modified", "true".to_string()),
            ])
            .unwrap();

        assert_eq!(backend.get("min_rating").unwrap().as_deref(), Some("6.5"));
        assert_eq!(backend.get("is_modified").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prefs.db");

        {
            let backend = SqliteSettingsBackend::new(&path).unwrap();
            backend
                .put_many(&[("favorite_items", "[]".to_string())])
                .unwrap();
        }

        let reopened = SqliteSettingsBackend::new(&path).unwrap();
        assert_eq!(
            reopened.get("favorite_items").unwrap().as_deref(),
            Some("[]")
        );
    }
}
