//! Local key-value persistence for session and ledger snapshots.
//!
//! State survives restarts under fixed storage keys. Corrupt or unreadable
//! entries are treated as absence so a bad snapshot can never wedge startup.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::StorageError;

/// Storage key for the persisted credential.
pub const AUTH_KEY: &str = "auth";
/// Storage key for the cart snapshot.
pub const CART_KEY: &str = "cart";
/// Storage key for the favorites snapshot.
pub const FAVORITES_KEY: &str = "favorites";

/// Minimal key-value persistence boundary.
///
/// Implementations must be safe to share across tasks; values are opaque
/// JSON strings produced by the snapshot helpers below.
pub trait KeyValueStore: Send + Sync {
    /// Load the value for `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on I/O failure other than absence.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on I/O failure.
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value for `key`; absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on I/O failure.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// Snapshot helpers
// =============================================================================

/// Load and decode a JSON snapshot.
///
/// Anything that prevents producing a value - missing entry, I/O failure,
/// corrupt JSON - reads as `None`; failures are logged at `warn`.
pub fn load_snapshot<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(error) => {
            warn!(key, %error, "failed to read persisted state, treating as absent");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(key, %error, "persisted state is corrupt, treating as absent");
            None
        }
    }
}

/// Encode and store a JSON snapshot, best-effort.
///
/// Persistence failures are logged and swallowed: local state remains the
/// source of truth for the running process.
pub fn save_snapshot<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let encoded = match serde_json::to_string(value) {
        Ok(encoded) => encoded,
        Err(error) => {
            warn!(key, %error, "failed to encode state snapshot");
            return;
        }
    };
    if let Err(error) = store.save(key, &encoded) {
        warn!(key, %error, "failed to persist state snapshot");
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// File-backed store: one JSON file per key under a state directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .expect("storage mutex poisoned")
            .get(key)
            .cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .expect("storage mutex poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .expect("storage mutex poisoned")
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        name: String,
        count: u32,
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load("cart").unwrap().is_none());
        store.save("cart", "{}").unwrap();
        assert_eq!(store.load("cart").unwrap().as_deref(), Some("{}"));
        store.remove("cart").unwrap();
        assert!(store.load("cart").unwrap().is_none());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.load("auth").unwrap().is_none());
        store.save("auth", r#"{"access":"a"}"#).unwrap();
        assert_eq!(
            store.load("auth").unwrap().as_deref(),
            Some(r#"{"access":"a"}"#)
        );
        store.remove("auth").unwrap();
        assert!(store.load("auth").unwrap().is_none());
        // Removing again is not an error
        store.remove("auth").unwrap();
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let store = MemoryStore::new();
        let snapshot = Snapshot {
            name: "cart".into(),
            count: 3,
        };
        save_snapshot(&store, CART_KEY, &snapshot);
        let back: Snapshot = load_snapshot(&store, CART_KEY).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_corrupt_snapshot_reads_as_absent() {
        let store = MemoryStore::new();
        store.save(AUTH_KEY, "{not json").unwrap();
        let loaded: Option<Snapshot> = load_snapshot(&store, AUTH_KEY);
        assert!(loaded.is_none());
    }
}
