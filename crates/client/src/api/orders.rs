//! Order lifecycle endpoints.

use tracing::instrument;

use blossom_core::{CheckoutData, Order, OrderId, Paginated};

use crate::error::ApiError;
use crate::gateway::RequestGateway;

/// Orders endpoint group.
#[derive(Clone)]
pub struct OrdersApi {
    gateway: RequestGateway,
}

impl OrdersApi {
    #[must_use]
    pub const fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Place an order from validated checkout data.
    ///
    /// Validation runs locally before any network call, and the session is
    /// re-checked: placing an order anonymously is rejected here rather
    /// than round-tripping to a guaranteed 401.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` with field-level messages on invalid
    /// input, `ApiError::NotAuthenticated` without a session, or the
    /// request's own failure.
    #[instrument(skip_all)]
    pub async fn create(&self, data: &CheckoutData) -> Result<Order, ApiError> {
        data.validate()?;
        if !self.gateway.session().is_authenticated() {
            return Err(ApiError::NotAuthenticated);
        }
        self.gateway.post("/orders/", data).await
    }

    /// List the current user's orders.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Paginated<Order>, ApiError> {
        self.gateway.get("/orders/").await
    }

    /// Get one order with its items.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the order is not found or the request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get(&self, id: OrderId) -> Result<Order, ApiError> {
        self.gateway.get(&format!("/orders/{id}/")).await
    }
}
