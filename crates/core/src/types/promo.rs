//! Promotional code value object.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A promotional code as returned by the promo-lookup endpoint.
///
/// A promo carries either a percentage discount or a fixed amount, never
/// both. Records with both fields set are rejected when applied to a cart.
/// Expiry and activity are validated server-side; the client treats a promo
/// handed to it as already vetted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_amount: Option<Decimal>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl PromoCode {
    /// Whether the record carries both a percentage and a fixed amount.
    ///
    /// Such records are ambiguous and must not be attached to a cart.
    #[must_use]
    pub const fn has_ambiguous_discount(&self) -> bool {
        self.discount_percent.is_some() && self.fixed_amount.is_some()
    }
}
