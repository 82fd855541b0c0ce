//! Favorites ledger.
//!
//! Local membership is the UI's source of truth: toggles apply
//! synchronously and never wait on the network. Each mutation emits a
//! mirror intent onto a channel; a background task delivers intents to the
//! server when the session is authenticated. Delivery failures are logged
//! and never rolled back - divergence is reconciled by the next
//! [`sync_with_server`](FavoritesLedger::sync_with_server) pass.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use blossom_core::{Product, ProductId};

use crate::api::FavoritesApi;
use crate::auth::AuthStatus;
use crate::error::ApiError;
use crate::storage::{self, FAVORITES_KEY, KeyValueStore};

/// A pending remote mirror of one local mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MirrorIntent {
    Add(ProductId),
    Remove(ProductId),
}

/// Persisted favorites snapshot. The sync flag is transient session state
/// and deliberately excluded.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FavoritesSnapshot {
    items: Vec<Product>,
}

struct FavoritesState {
    items: Vec<Product>,
    /// Whether local state has been reconciled with the server this
    /// session.
    is_synced: bool,
}

struct FavoritesInner {
    state: Mutex<FavoritesState>,
    store: Arc<dyn KeyValueStore>,
    mirror_tx: mpsc::UnboundedSender<MirrorIntent>,
}

/// The favorites service: optimistic local set plus lazy server
/// reconciliation.
#[derive(Clone)]
pub struct FavoritesLedger {
    inner: Arc<FavoritesInner>,
    api: FavoritesApi,
}

impl FavoritesLedger {
    /// Create the ledger, restoring a persisted snapshot when one exists,
    /// and spawn the mirror delivery task.
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        api: FavoritesApi,
        auth: Arc<dyn AuthStatus>,
    ) -> Self {
        let snapshot: FavoritesSnapshot =
            storage::load_snapshot(store.as_ref(), FAVORITES_KEY).unwrap_or_default();
        let (mirror_tx, mirror_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_mirror_worker(mirror_rx, api.clone(), auth));

        Self {
            inner: Arc::new(FavoritesInner {
                state: Mutex::new(FavoritesState {
                    items: snapshot.items,
                    is_synced: false,
                }),
                store,
                mirror_tx,
            }),
            api,
        }
    }

    // =========================================================================
    // Local mutations (synchronous)
    // =========================================================================

    /// Flip membership for a product. Returns the new membership.
    pub fn toggle(&self, product: Product) -> bool {
        if self.is_favorite(product.id) {
            self.remove(product.id);
            false
        } else {
            self.add(product);
            true
        }
    }

    /// Add a product to the local set. Returns whether it was newly added.
    pub fn add(&self, product: Product) -> bool {
        let id = product.id;
        let added = self.mutate(|state| {
            if state.items.iter().any(|p| p.id == id) {
                false
            } else {
                state.items.push(product);
                true
            }
        });
        if added {
            self.emit(MirrorIntent::Add(id));
        }
        added
    }

    /// Remove a product from the local set. Returns whether it was present.
    pub fn remove(&self, product_id: ProductId) -> bool {
        let removed = self.mutate(|state| {
            let before = state.items.len();
            state.items.retain(|p| p.id != product_id);
            state.items.len() != before
        });
        if removed {
            self.emit(MirrorIntent::Remove(product_id));
        }
        removed
    }

    // =========================================================================
    // Observers
    // =========================================================================

    #[must_use]
    pub fn is_favorite(&self, product_id: ProductId) -> bool {
        self.read(|state| state.items.iter().any(|p| p.id == product_id))
    }

    /// Current favorites in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<Product> {
        self.read(|state| state.items.clone())
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.read(|state| state.items.len())
    }

    /// Whether local state has been reconciled with the server this
    /// session.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.read(|state| state.is_synced)
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Reconcile with the server, typically once right after
    /// authentication settles.
    ///
    /// On the first pass with local items present, the full local id set is
    /// pushed to the merge endpoint (local ∪ remote becomes the server's
    /// truth); local state is then replaced wholesale with the server's
    /// authoritative response. Once synced, later calls are a plain
    /// re-fetch. Concurrent calls are safe; the last writer wins.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if a remote call fails; local state is untouched
    /// in that case.
    #[instrument(skip(self))]
    pub async fn sync_with_server(&self) -> Result<(), ApiError> {
        let (local_ids, was_synced) = self.read(|state| {
            (
                state.items.iter().map(|p| p.id).collect::<Vec<_>>(),
                state.is_synced,
            )
        });

        if !was_synced && !local_ids.is_empty() {
            let summary = self.api.sync(&local_ids).await?;
            debug!(
                added = summary.added,
                removed = summary.removed,
                "merged local favorites into server set"
            );
        }

        let server_items = self.api.list().await?;
        self.mutate(|state| {
            state.items = server_items;
            state.is_synced = true;
        });
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn emit(&self, intent: MirrorIntent) {
        if self.inner.mirror_tx.send(intent).is_err() {
            // Worker gone (runtime shutting down); local state stands.
            debug!("favorites mirror worker unavailable");
        }
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut FavoritesState) -> T) -> T {
        let mut state = self.inner.state.lock().expect("favorites mutex poisoned");
        let result = f(&mut state);
        let snapshot = FavoritesSnapshot {
            items: state.items.clone(),
        };
        storage::save_snapshot(self.inner.store.as_ref(), FAVORITES_KEY, &snapshot);
        result
    }

    fn read<T>(&self, f: impl FnOnce(&FavoritesState) -> T) -> T {
        f(&self.inner.state.lock().expect("favorites mutex poisoned"))
    }
}

/// Deliver mirror intents in toggle order, best-effort.
async fn run_mirror_worker(
    mut rx: mpsc::UnboundedReceiver<MirrorIntent>,
    api: FavoritesApi,
    auth: Arc<dyn AuthStatus>,
) {
    while let Some(intent) = rx.recv().await {
        if !auth.is_authenticated() {
            debug!(?intent, "session anonymous, skipping favorites mirror");
            continue;
        }
        let result = match intent {
            MirrorIntent::Add(id) => api.add(id).await.map(|_| ()),
            MirrorIntent::Remove(id) => api.remove(id).await.map(|_| ()),
        };
        if let Err(error) = result {
            // Local state is authoritative between syncs; never surface.
            warn!(?intent, %error, "favorites mirror call failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthSession;
    use crate::gateway::RequestGateway;
    use crate::host::DetachedHost;
    use crate::storage::MemoryStore;
    use blossom_core::CategoryId;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    struct NeverAuthenticated;

    impl AuthStatus for NeverAuthenticated {
        fn is_authenticated(&self) -> bool {
            false
        }
    }

    fn product(id: i64) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: CategoryId::new(1),
            title: format!("product-{id}"),
            slug: format!("product-{id}"),
            description: String::new(),
            price: Decimal::from(100),
            stock: 5,
            is_active: true,
            image_url: String::new(),
            images: Vec::new(),
            is_new: false,
            is_hit: false,
            created_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    fn ledger_with_store(store: Arc<MemoryStore>) -> FavoritesLedger {
        // The gateway points nowhere; mirror calls fail and are logged,
        // which is exactly the silent best-effort contract.
        let session = AuthSession::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/api/v1",
            store.clone(),
            Arc::new(DetachedHost),
        );
        let gateway = RequestGateway::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/api/v1",
            session,
            Arc::new(DetachedHost),
        );
        FavoritesLedger::new(store, FavoritesApi::new(gateway), Arc::new(NeverAuthenticated))
    }

    fn ledger() -> FavoritesLedger {
        ledger_with_store(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_toggle_is_immediate_and_local() {
        let favorites = ledger();
        assert!(favorites.toggle(product(1)));
        assert!(favorites.is_favorite(ProductId::new(1)));
        assert_eq!(favorites.count(), 1);
    }

    #[tokio::test]
    async fn test_double_toggle_restores_membership() {
        let favorites = ledger();
        favorites.toggle(product(1));
        assert!(!favorites.toggle(product(1)));
        assert!(!favorites.is_favorite(ProductId::new(1)));
        assert_eq!(favorites.count(), 0);
    }

    #[tokio::test]
    async fn test_add_twice_is_single_membership() {
        let favorites = ledger();
        assert!(favorites.add(product(1)));
        assert!(!favorites.add(product(1)));
        assert_eq!(favorites.count(), 1);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let favorites = ledger();
        assert!(!favorites.remove(ProductId::new(9)));
    }

    #[tokio::test]
    async fn test_items_keep_insertion_order() {
        let favorites = ledger();
        favorites.add(product(3));
        favorites.add(product(1));
        favorites.add(product(2));
        let ids: Vec<_> = favorites.items().iter().map(|p| p.id.as_i64()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_snapshot_survives_restart_without_sync_flag() {
        let store = Arc::new(MemoryStore::new());
        {
            let favorites = ledger_with_store(store.clone());
            favorites.add(product(1));
            favorites.add(product(2));
        }
        let restored = ledger_with_store(store);
        assert_eq!(restored.count(), 2);
        // The sync flag is per-session, never persisted.
        assert!(!restored.is_synced());
    }

    #[tokio::test]
    async fn test_starts_unsynced() {
        assert!(!ledger().is_synced());
    }
}
