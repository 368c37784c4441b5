//! Abandoned-cart event payload.

use rust_decimal::Decimal;
use serde::Deserialize;

use cartsync_core::CartItem;

/// Tag applied when the storefront does not send any.
pub const DEFAULT_CART_TAG: &str = "Abandoned Cart";

/// An abandoned cart reported by the storefront.
///
/// Transient: never stored, only relayed to the marketing platform.
/// `email` stays a raw string here so a missing or malformed address is
/// reported as a validation error rather than a body rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbandonedCart {
    pub customer_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub cart_id: String,
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
    pub total_price: Decimal,
    pub abandonment_timestamp: String,
    pub return_url: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl AbandonedCart {
    /// Tags implied by this event.
    #[must_use]
    pub fn event_tags(&self) -> Vec<String> {
        self.tags
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_CART_TAG.to_string()])
    }
}
