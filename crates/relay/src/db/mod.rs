//! Local user storage.
//!
//! The relay keeps registered users in process memory only; nothing
//! survives a restart. Storage sits behind the [`SubscriberDirectory`]
//! trait so handlers and tests never depend on the concrete store.

pub mod users;

pub use users::{InMemoryDirectory, SubscriberDirectory};

use thiserror::Error;

/// Errors from directory operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// Name was empty.
    #[error("Name is required")]
    InvalidName,

    /// No user is registered under this email.
    #[error("User not found: {0}")]
    NotFound(String),
}
