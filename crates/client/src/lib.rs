//! Blossom storefront client SDK.
//!
//! The session & request-authentication core for a storefront embedded in a
//! chat-platform mini-app host, plus the local commerce state machines:
//!
//! - [`auth::AuthSession`] - token lifecycle: acquisition, caching,
//!   race-safe refresh, logout
//! - [`gateway::RequestGateway`] - credential injection and transparent
//!   single retry on 401
//! - [`cart::CartLedger`] - cart lines, promo, derived pricing
//! - [`favorites::FavoritesLedger`] - optimistic favorites with lazy server
//!   reconciliation
//! - [`api`] - typed REST endpoint groups
//! - [`analytics::AnalyticsTracker`] - best-effort telemetry sidecar
//!
//! [`ShopClient`] wires everything into one explicitly-owned context: no
//! ambient globals, every collaborator injected, so the core is testable
//! without a UI harness.
//!
//! # Example
//!
//! ```rust,ignore
//! use blossom_client::{ClientConfig, ShopClient};
//!
//! let config = ClientConfig::from_env()?;
//! let client = ShopClient::new(&config);
//! client.init().await;
//!
//! let page = client.products().products(&Default::default()).await?;
//! if let Some(product) = page.results.first() {
//!     client.cart().add_item(product.clone(), 1);
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod api;
pub mod auth;
pub mod cart;
pub mod config;
pub mod error;
pub mod favorites;
pub mod gateway;
pub mod host;
pub mod storage;

use std::sync::Arc;

use tracing::{info, warn};

use blossom_core::Identity;

pub use analytics::AnalyticsTracker;
pub use auth::{AuthSession, SessionState};
pub use cart::CartLedger;
pub use config::ClientConfig;
pub use error::{ApiError, AuthError};
pub use favorites::FavoritesLedger;
pub use gateway::RequestGateway;

use api::{FavoritesApi, OrdersApi, PagesApi, ProductsApi};
use host::{DetachedHost, HostBridge, TelegramHost};
use storage::{FileStore, KeyValueStore};

/// The assembled storefront client.
///
/// Owns the session, the gateway, both ledgers, the typed API groups, and
/// the analytics sidecar. Cheap to clone; all parts share state through
/// their own `Arc`s.
#[derive(Clone)]
pub struct ShopClient {
    session: AuthSession,
    gateway: RequestGateway,
    products: ProductsApi,
    orders: OrdersApi,
    pages: PagesApi,
    cart: CartLedger,
    favorites: FavoritesLedger,
    analytics: AnalyticsTracker,
}

impl ShopClient {
    /// Assemble a client from configuration, with file-backed persistence
    /// and the host bridge the environment provides.
    ///
    /// Must be called within a Tokio runtime (background delivery tasks are
    /// spawned here).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never
    /// happen under normal circumstances as we use standard TLS
    /// configuration.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.state_dir));
        let host: Arc<dyn HostBridge> = match &config.host_init_data {
            Some(init_data) => Arc::new(TelegramHost::new(init_data.clone())),
            None => Arc::new(DetachedHost),
        };
        Self::with_parts(config, store, host)
    }

    /// Assemble a client with explicit storage and host capabilities.
    ///
    /// This is the constructor tests and embedding shells use.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn with_parts(
        config: &ClientConfig,
        store: Arc<dyn KeyValueStore>,
        host: Arc<dyn HostBridge>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .expect("Failed to create HTTP client");

        let session = AuthSession::new(
            http.clone(),
            config.api_base_url.clone(),
            store.clone(),
            host.clone(),
        );
        let gateway = RequestGateway::new(
            http.clone(),
            config.api_base_url.clone(),
            session.clone(),
            host,
        );

        let products = ProductsApi::new(gateway.clone());
        let orders = OrdersApi::new(gateway.clone());
        let pages = PagesApi::new(gateway.clone());
        let cart = CartLedger::new(store.clone());
        let favorites = FavoritesLedger::new(
            store,
            FavoritesApi::new(gateway.clone()),
            Arc::new(session.clone()),
        );
        let analytics =
            AnalyticsTracker::new(http, config.api_base_url.clone(), session.clone());

        Self {
            session,
            gateway,
            products,
            orders,
            pages,
            cart,
            favorites,
            analytics,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Settle authentication, then reconcile favorites when a session
    /// materialized. Reconciliation failure is logged, never fatal: the
    /// local ledger stays authoritative until the next sync.
    pub async fn init(&self) -> SessionState {
        let state = self.session.init().await;
        info!(?state, "session initialized");
        if state == SessionState::Authenticated
            && let Err(error) = self.favorites.sync_with_server().await
        {
            warn!(%error, "favorites reconciliation failed");
        }
        state
    }

    /// Re-fetch the current identity from the service and cache it on the
    /// session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn fetch_identity(&self) -> Result<Identity, ApiError> {
        let me: auth::WireUser = self.gateway.get("/auth/me/").await?;
        let identity = Identity::from(me);
        self.session.update_identity(identity.clone());
        Ok(identity)
    }

    /// Clear the session and persisted credential.
    pub fn logout(&self) {
        self.session.logout();
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    #[must_use]
    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    #[must_use]
    pub fn products(&self) -> &ProductsApi {
        &self.products
    }

    #[must_use]
    pub fn orders(&self) -> &OrdersApi {
        &self.orders
    }

    #[must_use]
    pub fn pages(&self) -> &PagesApi {
        &self.pages
    }

    #[must_use]
    pub fn cart(&self) -> &CartLedger {
        &self.cart
    }

    #[must_use]
    pub fn favorites(&self) -> &FavoritesLedger {
        &self.favorites
    }

    #[must_use]
    pub fn analytics(&self) -> &AnalyticsTracker {
        &self.analytics
    }
}
