//! Shopping cart ledger.
//!
//! Owns the cart lines and the single attached promo code. All mutation is
//! synchronous and atomic; pricing getters are pure functions of current
//! state. Every mutation persists a snapshot so the cart survives restarts.
//!
//! Quantity invariant: a line's quantity stays within `[1, stock]` of its
//! product snapshot. Excess above stock is dropped at the clamp boundary,
//! never silently carried.

use std::sync::{Arc, Mutex};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use blossom_core::{CartLine, FieldViolation, Product, ProductId, PromoCode, ValidationError};

use crate::storage::{self, CART_KEY, KeyValueStore};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CartState {
    items: Vec<CartLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    promo: Option<PromoCode>,
}

struct CartInner {
    state: Mutex<CartState>,
    store: Arc<dyn KeyValueStore>,
}

/// The cart service: line items, promo, derived pricing.
#[derive(Clone)]
pub struct CartLedger {
    inner: Arc<CartInner>,
}

impl CartLedger {
    /// Create the ledger, restoring a persisted snapshot when one exists.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let state = storage::load_snapshot(store.as_ref(), CART_KEY).unwrap_or_default();
        Self {
            inner: Arc::new(CartInner {
                state: Mutex::new(state),
                store,
            }),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of a product.
    ///
    /// An existing line for the same product is incremented (one line per
    /// product); a new line is appended, preserving insertion order. The
    /// resulting quantity is clamped to the snapshot's stock. Out-of-stock
    /// products never enter the cart.
    pub fn add_item(&self, product: Product, quantity: u32) {
        if product.stock == 0 {
            debug!(product_id = %product.id, "ignoring add of out-of-stock product");
            return;
        }
        self.mutate(|state| {
            let quantity = quantity.max(1);
            if let Some(line) = state.items.iter_mut().find(|l| l.product_id == product.id) {
                line.quantity = line.quantity.saturating_add(quantity).min(line.product.stock);
            } else {
                let quantity = quantity.min(product.stock);
                state.items.push(CartLine {
                    product_id: product.id,
                    product,
                    quantity,
                });
            }
        });
    }

    /// Remove a line entirely; no-op if absent.
    pub fn remove_item(&self, product_id: ProductId) {
        self.mutate(|state| {
            state.items.retain(|line| line.product_id != product_id);
        });
    }

    /// Set a line's quantity. Zero removes the line; anything above the
    /// snapshot's stock is clamped down.
    pub fn update_quantity(&self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove_item(product_id);
            return;
        }
        self.mutate(|state| {
            if let Some(line) = state.items.iter_mut().find(|l| l.product_id == product_id) {
                line.quantity = quantity.min(line.product.stock);
            }
        });
    }

    /// Empty the cart and drop any attached promo.
    pub fn clear(&self) {
        self.mutate(|state| {
            state.items.clear();
            state.promo = None;
        });
    }

    /// Attach a promo code, replacing any existing one.
    ///
    /// Expiry/activity are the caller's concern (validated against the
    /// promo-lookup endpoint); only structural ambiguity is rejected here.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when the promo carries both a percentage
    /// and a fixed amount.
    pub fn apply_promo(&self, promo: PromoCode) -> Result<(), ValidationError> {
        if promo.has_ambiguous_discount() {
            return Err(ValidationError {
                violations: vec![FieldViolation {
                    field: "promo_code",
                    message: "promo must carry either a percentage or a fixed amount, not both"
                        .to_string(),
                }],
            });
        }
        self.mutate(|state| {
            state.promo = Some(promo);
        });
        Ok(())
    }

    /// Detach the promo code, if any.
    pub fn remove_promo(&self) {
        self.mutate(|state| {
            state.promo = None;
        });
    }

    // =========================================================================
    // Derived state
    // =========================================================================

    /// Current lines in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartLine> {
        self.read(|state| state.items.clone())
    }

    /// The attached promo, if any.
    #[must_use]
    pub fn promo(&self) -> Option<PromoCode> {
        self.read(|state| state.promo.clone())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read(|state| state.items.is_empty())
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.read(|state| state.items.iter().map(|line| line.quantity).sum())
    }

    /// Sum of snapshot price times quantity over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.read(|state| state.items.iter().map(CartLine::line_total).sum())
    }

    /// Discount granted by the attached promo, capped at the subtotal.
    #[must_use]
    pub fn discount(&self) -> Decimal {
        self.read(|state| {
            let subtotal = state.items.iter().map(CartLine::line_total).sum();
            state
                .promo
                .as_ref()
                .map_or(Decimal::ZERO, |promo| discount_for(promo, subtotal))
        })
    }

    /// `subtotal - discount`; never negative since the discount is capped.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.subtotal() - self.discount()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn mutate(&self, f: impl FnOnce(&mut CartState)) {
        let mut state = self.inner.state.lock().expect("cart mutex poisoned");
        f(&mut state);
        storage::save_snapshot(self.inner.store.as_ref(), CART_KEY, &*state);
    }

    fn read<T>(&self, f: impl FnOnce(&CartState) -> T) -> T {
        f(&self.inner.state.lock().expect("cart mutex poisoned"))
    }
}

fn discount_for(promo: &PromoCode, subtotal: Decimal) -> Decimal {
    let raw = if let Some(percent) = promo.discount_percent {
        // Round to whole currency units, half away from zero.
        (subtotal * percent / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    } else if let Some(fixed) = promo.fixed_amount {
        fixed
    } else {
        Decimal::ZERO
    };
    raw.min(subtotal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use blossom_core::CategoryId;
    use chrono::{DateTime, Utc};

    fn product(id: i64, price: u64, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: CategoryId::new(1),
            title: format!("product-{id}"),
            slug: format!("product-{id}"),
            description: String::new(),
            price: Decimal::from(price),
            stock,
            is_active: true,
            image_url: String::new(),
            images: Vec::new(),
            is_new: false,
            is_hit: false,
            created_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    fn percent_promo(percent: u64) -> PromoCode {
        PromoCode {
            code: format!("PCT{percent}"),
            discount_percent: Some(Decimal::from(percent)),
            fixed_amount: None,
            is_active: true,
            expires_at: None,
        }
    }

    fn fixed_promo(amount: u64) -> PromoCode {
        PromoCode {
            code: format!("FIX{amount}"),
            discount_percent: None,
            fixed_amount: Some(Decimal::from(amount)),
            is_active: true,
            expires_at: None,
        }
    }

    fn ledger() -> CartLedger {
        CartLedger::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_add_item_appends_in_insertion_order() {
        let cart = ledger();
        cart.add_item(product(1, 100, 10), 1);
        cart.add_item(product(2, 200, 10), 1);
        let ids: Vec<_> = cart.items().iter().map(|l| l.product_id.as_i64()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_add_same_product_merges_lines() {
        let cart = ledger();
        cart.add_item(product(1, 100, 10), 2);
        cart.add_item(product(1, 100, 10), 3);
        let items = cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
    }

    #[test]
    fn test_add_clamps_to_stock() {
        let cart = ledger();
        cart.add_item(product(1, 100, 4), 3);
        cart.add_item(product(1, 100, 4), 3);
        assert_eq!(cart.items()[0].quantity, 4);
    }

    #[test]
    fn test_new_line_clamped_to_stock() {
        let cart = ledger();
        cart.add_item(product(1, 100, 2), 9);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_out_of_stock_product_is_ignored() {
        let cart = ledger();
        cart.add_item(product(1, 100, 0), 1);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_clamps() {
        let cart = ledger();
        cart.add_item(product(1, 100, 5), 1);
        cart.update_quantity(ProductId::new(1), 99);
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let cart = ledger();
        cart.add_item(product(1, 100, 5), 2);
        cart.update_quantity(ProductId::new(1), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_absent_product_is_noop() {
        let cart = ledger();
        cart.add_item(product(1, 100, 5), 1);
        cart.update_quantity(ProductId::new(9), 3);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_remove_item_absent_is_noop() {
        let cart = ledger();
        cart.remove_item(ProductId::new(42));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_never_exceeds_stock_across_sequences() {
        let cart = ledger();
        let p = product(1, 100, 7);
        cart.add_item(p.clone(), 3);
        cart.update_quantity(p.id, 6);
        cart.add_item(p.clone(), 5);
        cart.update_quantity(p.id, 2);
        cart.add_item(p, 20);
        let quantity = cart.items()[0].quantity;
        assert!((1..=7).contains(&quantity));
    }

    #[test]
    fn test_subtotal_sums_lines() {
        let cart = ledger();
        cart.add_item(product(1, 100, 10), 2);
        cart.add_item(product(2, 250, 10), 1);
        assert_eq!(cart.subtotal(), Decimal::from(450));
    }

    #[test]
    fn test_percent_discount() {
        let cart = ledger();
        cart.add_item(product(1, 1000, 10), 1);
        cart.apply_promo(percent_promo(10)).unwrap();
        assert_eq!(cart.discount(), Decimal::from(100));
        assert_eq!(cart.total(), Decimal::from(900));
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let cart = ledger();
        cart.add_item(product(1, 300, 10), 1);
        cart.apply_promo(fixed_promo(500)).unwrap();
        assert_eq!(cart.discount(), Decimal::from(300));
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_percent_discount_rounds_half_away_from_zero() {
        let cart = ledger();
        // 15% of 250 = 37.5 -> 38
        cart.add_item(product(1, 250, 10), 1);
        cart.apply_promo(percent_promo(15)).unwrap();
        assert_eq!(cart.discount(), Decimal::from(38));
    }

    #[test]
    fn test_discount_without_promo_is_zero() {
        let cart = ledger();
        cart.add_item(product(1, 100, 10), 1);
        assert_eq!(cart.discount(), Decimal::ZERO);
        assert_eq!(cart.total(), cart.subtotal());
    }

    #[test]
    fn test_discount_never_exceeds_subtotal() {
        let cart = ledger();
        cart.apply_promo(fixed_promo(1000)).unwrap();
        assert_eq!(cart.discount(), Decimal::ZERO);
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_apply_promo_replaces_existing() {
        let cart = ledger();
        cart.apply_promo(percent_promo(10)).unwrap();
        cart.apply_promo(fixed_promo(50)).unwrap();
        assert_eq!(cart.promo().unwrap().code, "FIX50");
    }

    #[test]
    fn test_ambiguous_promo_rejected() {
        let cart = ledger();
        let promo = PromoCode {
            code: "BROKEN".into(),
            discount_percent: Some(Decimal::from(10)),
            fixed_amount: Some(Decimal::from(500)),
            is_active: true,
            expires_at: None,
        };
        let err = cart.apply_promo(promo).unwrap_err();
        assert_eq!(err.violations[0].field, "promo_code");
        assert!(cart.promo().is_none());
    }

    #[test]
    fn test_clear_resets_items_and_promo() {
        let cart = ledger();
        cart.add_item(product(1, 100, 10), 2);
        cart.apply_promo(percent_promo(10)).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.promo().is_none());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_survives_restart() {
        let store = Arc::new(MemoryStore::new());
        {
            let cart = CartLedger::new(store.clone());
            cart.add_item(product(1, 100, 10), 2);
            cart.apply_promo(percent_promo(10)).unwrap();
        }
        let restored = CartLedger::new(store);
        assert_eq!(restored.item_count(), 2);
        assert_eq!(restored.promo().unwrap().code, "PCT10");
    }

    #[test]
    fn test_item_count_sums_quantities() {
        let cart = ledger();
        cart.add_item(product(1, 100, 10), 2);
        cart.add_item(product(2, 100, 10), 3);
        assert_eq!(cart.item_count(), 5);
    }
}
