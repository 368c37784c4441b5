//! Core types for cartsync.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod merge_fields;
pub mod subscriber;
pub mod tags;

pub use cart::{CartItem, format_cart_items};
pub use email::{Email, EmailError};
pub use id::*;
pub use merge_fields::{
    CartMergeFields, FieldType, MergeFieldSpec, MergeFields, REQUIRED_MERGE_FIELDS,
    UserMergeFields, split_name,
};
pub use subscriber::SubscriberHash;
pub use tags::TagSet;
