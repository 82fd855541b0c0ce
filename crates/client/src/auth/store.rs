//! Credential persistence.
//!
//! Secrets live in memory as `SecretString` and are exposed only here, at
//! the storage boundary. A corrupt stored session reads as absence: startup
//! falls back to the host-identity path instead of failing.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use blossom_core::Identity;

use super::Credential;
use crate::storage::{self, AUTH_KEY, KeyValueStore};

/// Serialized session snapshot.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    access: String,
    refresh: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_hint: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity: Option<Identity>,
}

/// Persists the current credential (and cached identity) across restarts.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the persisted credential, if a readable one exists.
    #[must_use]
    pub fn load(&self) -> Option<(Credential, Option<Identity>)> {
        let stored: StoredSession = storage::load_snapshot(self.store.as_ref(), AUTH_KEY)?;
        let credential = Credential {
            access: SecretString::from(stored.access),
            refresh: SecretString::from(stored.refresh),
            expires_hint: stored.expires_hint,
        };
        Some((credential, stored.identity))
    }

    /// Persist the credential, replacing any previous snapshot. Best-effort.
    pub fn save(&self, credential: &Credential, identity: Option<&Identity>) {
        let stored = StoredSession {
            access: credential.access.expose_secret().to_string(),
            refresh: credential.refresh.expose_secret().to_string(),
            expires_hint: credential.expires_hint,
            identity: identity.cloned(),
        };
        storage::save_snapshot(self.store.as_ref(), AUTH_KEY, &stored);
    }

    /// Remove the persisted snapshot. Best-effort; absence is fine.
    pub fn clear(&self) {
        if let Err(error) = self.store.remove(AUTH_KEY) {
            tracing::warn!(%error, "failed to clear persisted credential");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use blossom_core::UserId;

    fn credential() -> Credential {
        Credential {
            access: SecretString::from("access-1"),
            refresh: SecretString::from("refresh-1"),
            expires_hint: Some(1_750_000_000),
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let token_store = TokenStore::new(Arc::new(MemoryStore::new()));
        let identity = Identity {
            user_id: UserId::new(1),
            display_name: "Ada".into(),
            external_id: 42,
            username: None,
        };
        token_store.save(&credential(), Some(&identity));

        let (loaded, loaded_identity) = token_store.load().unwrap();
        assert_eq!(loaded.access.expose_secret(), "access-1");
        assert_eq!(loaded.refresh.expose_secret(), "refresh-1");
        assert_eq!(loaded.expires_hint, Some(1_750_000_000));
        assert_eq!(loaded_identity.unwrap().display_name, "Ada");
    }

    #[test]
    fn test_clear_removes_snapshot() {
        let token_store = TokenStore::new(Arc::new(MemoryStore::new()));
        token_store.save(&credential(), None);
        token_store.clear();
        assert!(token_store.load().is_none());
        // Clearing an empty store is a no-op
        token_store.clear();
    }

    #[test]
    fn test_corrupt_snapshot_is_absence() {
        let backing = Arc::new(MemoryStore::new());
        backing.save(AUTH_KEY, "{broken").unwrap();
        let token_store = TokenStore::new(backing);
        assert!(token_store.load().is_none());
    }
}
