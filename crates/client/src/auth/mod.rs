//! Authentication session.
//!
//! Single source of truth for "is this client authenticated" and "what
//! bearer token to present". Orchestrates the three credential paths:
//!
//! 1. A persisted credential from a previous run - trusted optimistically,
//!    no network round-trip.
//! 2. The host identity assertion, exchanged once at the login endpoint.
//! 3. Neither - the session settles as anonymous and browsing stays
//!    read-only.
//!
//! `init()` and `refresh()` are single-flight: callers that overlap one
//! in-flight exchange share its outcome instead of issuing duplicates. A
//! logout during an in-flight exchange wins - the late resolution is
//! discarded rather than resurrecting the cleared session.

mod endpoints;
mod store;

pub(crate) use endpoints::WireUser;
pub use store::TokenStore;

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use secrecy::SecretString;
use tracing::{debug, warn};

use blossom_core::Identity;

use crate::error::AuthError;
use crate::host::HostBridge;
use crate::storage::KeyValueStore;

/// The current access/refresh token pair.
///
/// Owned exclusively by [`AuthSession`]; at most one credential is current
/// at any time and replacing it is atomic from the caller's perspective.
#[derive(Debug, Clone)]
pub struct Credential {
    pub access: SecretString,
    pub refresh: SecretString,
    /// Advisory Unix timestamp after which the access token is likely
    /// stale. Recovery is 401-driven; this is never acted on proactively.
    pub expires_hint: Option<i64>,
}

/// Observable session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    /// `init()` is resolving the startup credential path.
    Initializing,
    Authenticated,
    Anonymous,
    /// A refresh exchange is in flight.
    Refreshing,
}

/// Read-only authentication capability handed to components that must not
/// hold the full session (favorites mirroring, telemetry).
pub trait AuthStatus: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

struct SessionCell {
    state: SessionState,
    credential: Option<Credential>,
    identity: Option<Identity>,
}

struct AuthSessionInner {
    http: reqwest::Client,
    base_url: String,
    store: TokenStore,
    host: Arc<dyn HostBridge>,
    cell: RwLock<SessionCell>,
    /// Flight gates: at most one login / one refresh exchange in the air.
    init_gate: tokio::sync::Mutex<()>,
    refresh_gate: tokio::sync::Mutex<()>,
    /// Completed-attempt counters; a waiter whose counter moved while it
    /// queued on the gate overlapped that attempt and shares its outcome.
    init_seq: AtomicU64,
    refresh_seq: AtomicU64,
    /// Teardown generation, bumped by logout/clear. An exchange resolving
    /// under a stale generation discards its result.
    epoch: AtomicU64,
}

/// Orchestrates login, refresh, and logout.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<AuthSessionInner>,
}

impl AuthSession {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        store: Arc<dyn KeyValueStore>,
        host: Arc<dyn HostBridge>,
    ) -> Self {
        Self {
            inner: Arc::new(AuthSessionInner {
                http,
                base_url: base_url.into(),
                store: TokenStore::new(store),
                host,
                cell: RwLock::new(SessionCell {
                    state: SessionState::Uninitialized,
                    credential: None,
                    identity: None,
                }),
                init_gate: tokio::sync::Mutex::new(()),
                refresh_gate: tokio::sync::Mutex::new(()),
                init_seq: AtomicU64::new(0),
                refresh_seq: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    // =========================================================================
    // Synchronous observers
    // =========================================================================

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.read_cell(|cell| cell.state)
    }

    /// Current access token, if any. Never blocks on I/O.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.read_cell(|cell| cell.credential.as_ref().map(|c| c.access.clone()))
    }

    /// Identity of the authenticated user, if any.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.read_cell(|cell| cell.identity.clone())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read_cell(|cell| cell.credential.is_some())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Settle the startup credential path.
    ///
    /// Idempotent and single-flight: a caller overlapping an in-flight
    /// `init()` receives that attempt's result; an already-authenticated
    /// session is returned as-is. Re-runnable after the session degrades to
    /// anonymous (the gateway's host re-auth path relies on this).
    pub async fn init(&self) -> SessionState {
        let seq = self.inner.init_seq.load(Ordering::Acquire);
        let _flight = self.inner.init_gate.lock().await;
        if self.inner.init_seq.load(Ordering::Acquire) != seq {
            // Overlapped an attempt that settled while we queued.
            return self.state();
        }
        if self.state() == SessionState::Authenticated {
            return SessionState::Authenticated;
        }

        let epoch = self.inner.epoch.load(Ordering::Acquire);
        self.set_state(SessionState::Initializing);

        // Cached credential: trusted without a round-trip.
        if let Some((credential, identity)) = self.inner.store.load() {
            debug!("restored persisted credential");
            self.install(credential, identity, false, None);
            self.inner.init_seq.fetch_add(1, Ordering::Release);
            return SessionState::Authenticated;
        }

        let settled = if let Some(init_data) = self.inner.host.init_data() {
            match endpoints::exchange_host_identity(&self.inner.http, &self.inner.base_url, &init_data)
                .await
            {
                Ok((credential, identity)) => {
                    if self.install(credential, Some(identity), true, Some(epoch)) {
                        SessionState::Authenticated
                    } else {
                        // Torn down while the exchange was in flight.
                        self.state()
                    }
                }
                Err(error) => {
                    warn!(%error, "host identity exchange failed, continuing anonymously");
                    self.set_state(SessionState::Anonymous);
                    SessionState::Anonymous
                }
            }
        } else {
            self.set_state(SessionState::Anonymous);
            SessionState::Anonymous
        };

        self.inner.init_seq.fetch_add(1, Ordering::Release);
        settled
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Single-flight: concurrent callers share one exchange and all observe
    /// its outcome. On success the new credential atomically replaces the
    /// old one and is persisted; the fresh access token is returned so the
    /// caller can retry with exactly this token. On failure the credential
    /// and identity are cleared (logical logout).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NoCredential` without a refresh token to spend,
    /// `AuthError::SessionCleared` if the session was torn down while the
    /// exchange was in flight, or the exchange's own failure.
    pub async fn refresh(&self) -> Result<SecretString, AuthError> {
        let seq = self.inner.refresh_seq.load(Ordering::Acquire);
        let _flight = self.inner.refresh_gate.lock().await;
        if self.inner.refresh_seq.load(Ordering::Acquire) != seq {
            // A refresh settled while we queued; its outcome is ours.
            return self.access_token().ok_or(AuthError::SessionCleared);
        }

        // Epoch before token: a logout landing between the two leaves the
        // token read empty, never the epoch check stale.
        let epoch = self.inner.epoch.load(Ordering::Acquire);
        let Some(refresh_token) =
            self.read_cell(|cell| cell.credential.as_ref().map(|c| c.refresh.clone()))
        else {
            return Err(AuthError::NoCredential);
        };

        self.set_state(SessionState::Refreshing);

        let outcome =
            endpoints::exchange_refresh_token(&self.inner.http, &self.inner.base_url, &refresh_token)
                .await;
        self.inner.refresh_seq.fetch_add(1, Ordering::Release);

        match outcome {
            Ok(grant) => {
                let access = grant.access.clone();
                let credential = Credential {
                    access: grant.access,
                    // The service rotates the refresh token only sometimes;
                    // keep spending the old one otherwise.
                    refresh: grant.refresh.unwrap_or(refresh_token),
                    expires_hint: grant.expires_hint,
                };
                if !self.install(credential, None, true, Some(epoch)) {
                    // Logged out mid-flight; the cleared session stands.
                    return Err(AuthError::SessionCleared);
                }
                debug!("access token refreshed");
                Ok(access)
            }
            Err(error) => {
                warn!(%error, "token refresh failed, clearing session");
                if self.inner.epoch.load(Ordering::Acquire) == epoch {
                    self.clear();
                }
                Err(error)
            }
        }
    }

    /// Clear the session and persisted credential. Idempotent.
    pub fn logout(&self) {
        self.clear();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn read_cell<T>(&self, f: impl FnOnce(&SessionCell) -> T) -> T {
        f(&self.inner.cell.read().expect("session lock poisoned"))
    }

    fn set_state(&self, state: SessionState) {
        self.inner.cell.write().expect("session lock poisoned").state = state;
    }

    /// Atomically replace the credential (and optionally the identity).
    ///
    /// With `expected_epoch` set, the replacement only happens if no
    /// teardown intervened since the caller captured that epoch; returns
    /// whether the credential was installed.
    fn install(
        &self,
        credential: Credential,
        identity: Option<Identity>,
        persist: bool,
        expected_epoch: Option<u64>,
    ) -> bool {
        {
            let mut cell = self.inner.cell.write().expect("session lock poisoned");
            if let Some(expected) = expected_epoch
                && self.inner.epoch.load(Ordering::Acquire) != expected
            {
                return false;
            }
            cell.state = SessionState::Authenticated;
            if let Some(identity) = identity {
                cell.identity = Some(identity);
            }
            cell.credential = Some(credential);
        }
        if persist {
            let cell = self.inner.cell.read().expect("session lock poisoned");
            if let Some(credential) = &cell.credential {
                self.inner.store.save(credential, cell.identity.as_ref());
            }
        }
        true
    }

    fn clear(&self) {
        {
            let mut cell = self.inner.cell.write().expect("session lock poisoned");
            cell.state = SessionState::Anonymous;
            cell.credential = None;
            cell.identity = None;
            self.inner.epoch.fetch_add(1, Ordering::Release);
        }
        self.inner.store.clear();
    }

    /// Replace the cached identity after a `GET /auth/me/` revalidation.
    pub(crate) fn update_identity(&self, identity: Identity) {
        let mut cell = self.inner.cell.write().expect("session lock poisoned");
        cell.identity = Some(identity);
    }
}

impl AuthStatus for AuthSession {
    fn is_authenticated(&self) -> bool {
        Self::is_authenticated(self)
    }
}
