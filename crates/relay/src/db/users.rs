//! Subscriber directory: the in-memory registry of known users.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use cartsync_core::{Email, UserId};

use super::RepositoryError;
use crate::models::{User, UserUpdate};

/// Registry of users known to the relay.
#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    /// Register a user under the next sequential ID.
    ///
    /// Duplicate emails are accepted; lookups return the earliest match.
    async fn register(&self, name: &str, email: Email) -> Result<User, RepositoryError>;

    /// Find the earliest-registered user with exactly this email.
    async fn find_by_email(&self, email: &str) -> Option<User>;

    /// Apply `update` to the user registered under `email`.
    async fn update(&self, email: &str, update: &UserUpdate) -> Result<User, RepositoryError>;

    /// Snapshot of every user in registration order.
    async fn list(&self) -> Vec<User>;
}

/// [`SubscriberDirectory`] backed by process memory.
///
/// Users are kept in registration order next to an email index, so lookups
/// are O(1) while listings stay ordered.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<DirectoryState>,
}

#[derive(Debug)]
struct DirectoryState {
    users: Vec<User>,
    /// Email -> positions in `users`, ascending.
    by_email: HashMap<String, Vec<usize>>,
    next_id: UserId,
}

impl Default for DirectoryState {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            by_email: HashMap::new(),
            next_id: UserId::FIRST,
        }
    }
}

impl DirectoryState {
    fn position(&self, email: &str) -> Option<usize> {
        self.by_email.get(email).and_then(|positions| positions.first().copied())
    }

    fn index(&mut self, email: &str, position: usize) {
        let positions = self.by_email.entry(email.to_string()).or_default();
        let at = positions.partition_point(|&p| p < position);
        positions.insert(at, position);
    }

    fn unindex(&mut self, email: &str, position: usize) {
        if let Some(positions) = self.by_email.get_mut(email) {
            positions.retain(|&p| p != position);
            if positions.is_empty() {
                self.by_email.remove(email);
            }
        }
    }
}

impl InMemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriberDirectory for InMemoryDirectory {
    async fn register(&self, name: &str, email: Email) -> Result<User, RepositoryError> {
        if name.is_empty() {
            return Err(RepositoryError::InvalidName);
        }

        let mut state = self.inner.write().await;
        let user = User {
            id: state.next_id,
            name: name.to_string(),
            email,
            signup_date: Utc::now(),
        };
        state.next_id = state.next_id.next();

        let position = state.users.len();
        state.index(user.email.as_str(), position);
        state.users.push(user.clone());

        tracing::debug!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Option<User> {
        let state = self.inner.read().await;
        state
            .position(email)
            .and_then(|position| state.users.get(position))
            .cloned()
    }

    async fn update(&self, email: &str, update: &UserUpdate) -> Result<User, RepositoryError> {
        let mut state = self.inner.write().await;
        let position = state
            .position(email)
            .ok_or_else(|| RepositoryError::NotFound(email.to_string()))?;

        let Some(user) = state.users.get_mut(position) else {
            return Err(RepositoryError::NotFound(email.to_string()));
        };
        let old_email = user.email.as_str().to_string();
        update.apply_to(user);
        let updated = user.clone();

        if updated.email.as_str() != old_email {
            state.unindex(&old_email, position);
            state.index(updated.email.as_str(), position);
        }

        tracing::debug!(user_id = %updated.id, "Updated user");
        Ok(updated)
    }

    async fn list(&self) -> Vec<User> {
        self.inner.read().await.users.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_register_then_find() {
        let directory = InMemoryDirectory::new();
        let before = Utc::now();
        let registered = directory
            .register("Jane Doe", email("jane@x.com"))
            .await
            .unwrap();
        let after = Utc::now();

        let found = directory.find_by_email("jane@x.com").await.unwrap();
        assert_eq!(found, registered);
        assert_eq!(found.id, UserId::FIRST);
        assert_eq!(found.name, "Jane Doe");
        assert_eq!(found.email.as_str(), "jane@x.com");
        assert!(found.signup_date >= before && found.signup_date <= after);
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let directory = InMemoryDirectory::new();
        let a = directory.register("A", email("a@x.com")).await.unwrap();
        let b = directory.register("B", email("b@x.com")).await.unwrap();
        let c = directory.register("C", email("c@x.com")).await.unwrap();
        assert_eq!(
            [a.id, b.id, c.id],
            [UserId::new(1), UserId::new(2), UserId::new(3)]
        );
    }

    #[tokio::test]
    async fn test_register_rejects_empty_name() {
        let directory = InMemoryDirectory::new();
        let err = directory.register("", email("a@x.com")).await.unwrap_err();
        assert_eq!(err, RepositoryError::InvalidName);
        assert!(directory.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_accepts_whitespace_name() {
        let directory = InMemoryDirectory::new();
        let user = directory.register(" ", email("a@x.com")).await.unwrap();
        assert_eq!(user.name, " ");
    }

    #[tokio::test]
    async fn test_update_with_empty_name_is_applied_verbatim() {
        let directory = InMemoryDirectory::new();
        directory.register("Jane", email("jane@x.com")).await.unwrap();

        let update = UserUpdate {
            name: Some(String::new()),
            email: None,
        };
        let updated = directory.update("jane@x.com", &update).await.unwrap();
        assert_eq!(updated.name, "");
    }

    #[tokio::test]
    async fn test_find_is_case_sensitive() {
        let directory = InMemoryDirectory::new();
        directory.register("Jane", email("Jane@X.com")).await.unwrap();
        assert!(directory.find_by_email("jane@x.com").await.is_none());
        assert!(directory.find_by_email("Jane@X.com").await.is_some());
    }

    #[tokio::test]
    async fn test_update_name_only() {
        let directory = InMemoryDirectory::new();
        let original = directory.register("Jane Doe", email("jane@x.com")).await.unwrap();

        let update = UserUpdate {
            name: Some("X".to_string()),
            email: None,
        };
        let updated = directory.update("jane@x.com", &update).await.unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.signup_date, original.signup_date);
        assert_eq!(updated.email, original.email);
        assert_eq!(updated.name, "X");
    }

    #[tokio::test]
    async fn test_update_email_reindexes() {
        let directory = InMemoryDirectory::new();
        directory.register("Jane", email("jane@x.com")).await.unwrap();

        let update = UserUpdate {
            name: None,
            email: Some(email("jane@y.com")),
        };
        directory.update("jane@x.com", &update).await.unwrap();

        assert!(directory.find_by_email("jane@x.com").await.is_none());
        let moved = directory.find_by_email("jane@y.com").await.unwrap();
        assert_eq!(moved.id, UserId::FIRST);
        assert_eq!(moved.name, "Jane");
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let directory = InMemoryDirectory::new();
        let err = directory
            .update("ghost@x.com", &UserUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::NotFound("ghost@x.com".to_string()));
    }

    #[tokio::test]
    async fn test_duplicates_resolve_to_earliest() {
        let directory = InMemoryDirectory::new();
        let first = directory.register("First", email("dup@x.com")).await.unwrap();
        let second = directory.register("Second", email("dup@x.com")).await.unwrap();

        assert_eq!(directory.find_by_email("dup@x.com").await.unwrap().id, first.id);

        // Moving the first away exposes the second under the shared address
        let update = UserUpdate {
            name: None,
            email: Some(email("moved@x.com")),
        };
        directory.update("dup@x.com", &update).await.unwrap();
        assert_eq!(directory.find_by_email("dup@x.com").await.unwrap().id, second.id);
        assert_eq!(directory.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_list_keeps_registration_order() {
        let directory = InMemoryDirectory::new();
        for (name, addr) in [("C", "c@x.com"), ("A", "a@x.com"), ("B", "b@x.com")] {
            directory.register(name, email(addr)).await.unwrap();
        }
        let names: Vec<_> = directory.list().await.into_iter().map(|u| u.name).collect();
        assert_eq!(names, ["C", "A", "B"]);
    }
}
