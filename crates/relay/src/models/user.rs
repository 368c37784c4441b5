//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cartsync_core::{Email, UserId};

/// A registered storefront user as known to the relay.
///
/// The relay is authoritative for name and email; the marketing platform is
/// authoritative for tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Sequential ID, starting at 1.
    pub id: UserId,
    /// Full name as supplied at registration.
    pub name: String,
    /// Email address, casing preserved.
    pub email: Email,
    /// When the user registered.
    pub signup_date: DateTime<Utc>,
}

/// Fields that may change on an existing user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<Email>,
}

impl UserUpdate {
    /// Apply the provided fields; `id` and `signup_date` never change.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name.clone_from(name);
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
    }
}
