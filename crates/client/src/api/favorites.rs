//! Remote favorites endpoints.
//!
//! The favorites ledger owns local state; these calls mirror it to the
//! server and feed the reconciliation pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use blossom_core::{Product, ProductId};

use crate::error::ApiError;
use crate::gateway::RequestGateway;

/// Outcome of an add/remove mutation.
#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteMutation {
    pub detail: String,
    pub is_favorite: bool,
}

/// Per-product membership flag from the batch check endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteStatus {
    pub product_id: ProductId,
    pub is_favorite: bool,
}

/// Result of a bulk merge push.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSummary {
    pub detail: String,
    pub added: u32,
    pub removed: u32,
}

/// What happened to a product in the favorites history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteAction {
    Added,
    Removed,
}

/// One entry of the favorites action history.
#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteHistoryEntry {
    pub id: i64,
    pub product: Product,
    pub action: FavoriteAction,
    pub action_display: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ProductRef {
    product_id: ProductId,
}

#[derive(Serialize)]
struct ProductIdSet<'a> {
    product_ids: &'a [ProductId],
}

/// Favorites endpoint group.
#[derive(Clone)]
pub struct FavoritesApi {
    gateway: RequestGateway,
}

impl FavoritesApi {
    #[must_use]
    pub const fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Fetch the server's authoritative favorites set.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Product>, ApiError> {
        self.gateway.get("/products/favorites/").await
    }

    /// Add one product to the server-side set.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(&self, product_id: ProductId) -> Result<FavoriteMutation, ApiError> {
        self.gateway
            .post("/products/favorites/", &ProductRef { product_id })
            .await
    }

    /// Remove one product from the server-side set.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: ProductId) -> Result<Option<FavoriteMutation>, ApiError> {
        self.gateway
            .delete(&format!("/products/favorites/{product_id}/"))
            .await
    }

    /// Push the full local id set; the server merges it into its own
    /// (local ∪ remote becomes the new truth).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip_all, fields(count = product_ids.len()))]
    pub async fn sync(&self, product_ids: &[ProductId]) -> Result<SyncSummary, ApiError> {
        self.gateway
            .post("/products/favorites/sync/", &ProductIdSet { product_ids })
            .await
    }

    /// Batch membership check.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip_all, fields(count = product_ids.len()))]
    pub async fn check(&self, product_ids: &[ProductId]) -> Result<Vec<FavoriteStatus>, ApiError> {
        self.gateway
            .post("/products/favorites/check/", &ProductIdSet { product_ids })
            .await
    }

    /// Action history for the current user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn history(&self) -> Result<Vec<FavoriteHistoryEntry>, ApiError> {
        self.gateway.get("/products/favorites/history/").await
    }
}
