//! Domain models for the relay.

pub mod cart;
pub mod user;

pub use cart::AbandonedCart;
pub use user::{User, UserUpdate};
