//! Abandoned-cart line items.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single line in an abandoned cart, as reported by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product name as shown to the shopper.
    pub name: String,
    /// Units in the cart.
    pub quantity: u32,
    /// Unit price in the store currency.
    pub price: Decimal,
}

impl fmt::Display for CartItem {
    /// Renders `"<name> (<quantity>) - $<price>"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) - ${}",
            self.name,
            self.quantity,
            self.price.normalize()
        )
    }
}

/// Format cart items for the `CARTITEMS` merge field, joined by `", "`.
#[must_use]
pub fn format_cart_items(items: &[CartItem]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
