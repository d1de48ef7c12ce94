//! In-memory settings backend for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::settings::{SettingsBackend, SettingsError};

/// Settings backend kept in a map.
///
/// Writes can be made to fail or to block for a while, to exercise
/// persistence error paths and slow storage.
#[derive(Debug, Default)]
pub struct MemorySettingsBackend {
    values: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    write_delay_ms: AtomicU64,
}

impl MemorySettingsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw value directly, bypassing encoding.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Raw stored value for `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    /// Make every following write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Block the writing thread this long before every write.
    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of successful `put_many` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SettingsBackend for MemorySettingsBackend {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.raw(key))
    }

    fn put_many(&self, entries: &[(&str, String)]) -> Result<(), SettingsError> {
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SettingsError::Database("mock write failure".to_string()));
        }

        let mut values = self.values.lock().unwrap();
        for (key, value) in entries {
            values.insert(key.to_string(), value.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let backend = MemorySettingsBackend::new();
        backend
            .put_many(&[("language", "\"en-EN\"".to_string())])
            .unwrap();
        assert_eq!(
            backend.get("language").unwrap().as_deref(),
            Some("\"en-EN\"")
        );
        assert_eq!(backend.write_count(), 1);
    }

    #[test]
    fn test_failing_writes() {
        let backend = MemorySettingsBackend::new();
        backend.fail_writes(true);
        assert!(backend.put_many(&[("k", "v".to_string())]).is_err());
        assert!(backend.raw("k").is_none());
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn test_write_delay_blocks_writer() {
        let backend = MemorySettingsBackend::new();
        backend.set_write_delay(Duration::from_millis(30));

        let started = std::time::Instant::now();
        backend.put_many(&[("k", "v".to_string())]).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(backend.raw("k").as_deref(), Some("v"));
    }
}
