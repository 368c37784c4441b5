//! Merge-field payloads and the list schema they depend on.
//!
//! Merge fields are named custom attributes on a list member. Each event
//! kind gets a closed record so only known fields ever reach the platform.

use serde::{Deserialize, Serialize};

use super::cart::{CartItem, format_cart_items};
use rust_decimal::Decimal;

/// Split a full name into first and last name.
///
/// The first space-separated token is the first name; the remaining tokens
/// are re-joined with single spaces. Splits on the literal space character
/// only, so a run of spaces yields empty tokens that survive the re-join.
#[must_use]
pub fn split_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split(' ');
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// Merge fields written for user lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct UserMergeFields {
    pub fname: String,
    pub lname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserMergeFields {
    /// Build name fields from a full name.
    #[must_use]
    pub fn from_name(full_name: &str) -> Self {
        let (fname, lname) = split_name(full_name);
        Self {
            fname,
            lname,
            email: None,
        }
    }

    /// Also write the `EMAIL` merge field.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Merge fields written for an abandoned cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartMergeFields {
    #[serde(rename = "FNAME")]
    pub fname: String,
    #[serde(rename = "LNAME")]
    pub lname: String,
    #[serde(rename = "CARTID")]
    pub cart_id: String,
    #[serde(rename = "CARTITEMS")]
    pub cart_items: String,
    #[serde(rename = "TOTALPRICE")]
    pub total_price: String,
    #[serde(rename = "ABNDNTIME")]
    pub abandoned_at: String,
    #[serde(rename = "RETURNURL")]
    pub return_url: String,
}

impl CartMergeFields {
    /// Build the cart merge fields from the storefront's cart details.
    #[must_use]
    pub fn new(
        customer_name: &str,
        cart_id: &str,
        items: &[CartItem],
        total_price: Decimal,
        abandoned_at: &str,
        return_url: &str,
    ) -> Self {
        let (fname, lname) = split_name(customer_name);
        Self {
            fname,
            lname,
            cart_id: cart_id.to_string(),
            cart_items: format_cart_items(items),
            total_price: total_price.normalize().to_string(),
            abandoned_at: abandoned_at.to_string(),
            return_url: return_url.to_string(),
        }
    }
}

/// Merge fields for any supported event, serialized as a flat object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MergeFields {
    Cart(CartMergeFields),
    User(UserMergeFields),
}

impl From<UserMergeFields> for MergeFields {
    fn from(fields: UserMergeFields) -> Self {
        Self::User(fields)
    }
}

impl From<CartMergeFields> for MergeFields {
    fn from(fields: CartMergeFields) -> Self {
        Self::Cart(fields)
    }
}

/// Platform data type of a merge field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
}

/// A merge field the list must define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeFieldSpec {
    pub tag: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Merge fields the abandoned-cart flow writes, provisioned at startup.
pub const REQUIRED_MERGE_FIELDS: [MergeFieldSpec; 5] = [
    MergeFieldSpec {
        tag: "CARTID",
        name: "Cart ID",
        field_type: FieldType::Text,
    },
    MergeFieldSpec {
        tag: "CARTITEMS",
        name: "Cart Items",
        field_type: FieldType::Text,
    },
    MergeFieldSpec {
        tag: "TOTALPRICE",
        name: "Total Price",
        field_type: FieldType::Number,
    },
    MergeFieldSpec {
        tag: "ABNDNTIME",
        name: "Abandonment Time",
        field_type: FieldType::Text,
    },
    MergeFieldSpec {
        tag: "RETURNURL",
        name: "Return URL",
        field_type: FieldType::Text,
    },
];
