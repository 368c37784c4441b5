//! User lifecycle intake.
//!
//! Registers and updates local users, then mirrors the change onto the
//! marketing list. Local changes are not rolled back when the platform call
//! fails; the error is reported and the local state stays as written.

use std::sync::Arc;

use cartsync_core::{Email, MergeFields, TagSet, UserMergeFields};
use tracing::instrument;

use super::mailchimp::RemoteSubscriber;
use super::marketing::MarketingPlatform;
use crate::db::SubscriberDirectory;
use crate::error::{AppError, Result};
use crate::models::{User, UserUpdate};

/// Tag applied when a user registers.
pub const REGISTERED_TAG: &str = "New-customer";

/// Tag applied when a user's details change.
///
/// Differs in casing from [`REGISTERED_TAG`]; both are live in existing
/// audiences, so neither is normalised here.
pub const UPDATED_TAG: &str = "New-Customer";

const INTEGRATION_FAILED: &str = "Mailchimp integration failed";
const REMOTE_LIST_FAILED: &str = "Failed to get users from Mailchimp";

/// Intake for user lifecycle events.
#[derive(Clone)]
pub struct UserService {
    directory: Arc<dyn SubscriberDirectory>,
    marketing: Arc<dyn MarketingPlatform>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(
        directory: Arc<dyn SubscriberDirectory>,
        marketing: Arc<dyn MarketingPlatform>,
    ) -> Self {
        Self {
            directory,
            marketing,
        }
    }

    /// Register a user locally and subscribe them with [`REGISTERED_TAG`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty name and
    /// `AppError::Integration` if the platform rejects the subscription; in
    /// the latter case the user stays registered.
    #[instrument(skip(self, name), fields(email = %email))]
    pub async fn register(&self, name: &str, email: Email) -> Result<User> {
        let user = self.directory.register(name, email).await?;
        tracing::info!(user_id = %user.id, "User registered");

        let tags: TagSet = [REGISTERED_TAG].into_iter().collect();
        self.marketing
            .add_subscriber(&user.email, &user.name, &tags)
            .await
            .map_err(|e| AppError::integration(e, INTEGRATION_FAILED))?;

        Ok(user)
    }

    /// Update a local user and mirror the change onto the list.
    ///
    /// The platform member is looked up under the user's previous address.
    /// An existing member gets new name/email merge fields plus
    /// [`UPDATED_TAG`] on top of its current tags; a missing member is
    /// subscribed afresh under the new address.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no user is registered under `email`
    /// and `AppError::Integration` if a platform call fails.
    #[instrument(skip(self, update), fields(email = %email))]
    pub async fn update(&self, email: &Email, update: &UserUpdate) -> Result<User> {
        let user = self.directory.update(email.as_str(), update).await?;
        tracing::info!(user_id = %user.id, "User updated");

        self.sync_update(email, &user)
            .await
            .map_err(|e| AppError::integration(e, INTEGRATION_FAILED))?;

        Ok(user)
    }

    async fn sync_update(
        &self,
        previous_email: &Email,
        user: &User,
    ) -> std::result::Result<RemoteSubscriber, super::MarketingError> {
        let event_tags: TagSet = [UPDATED_TAG].into_iter().collect();

        match self.marketing.get_subscriber(previous_email).await? {
            Some(member) => {
                let merge_fields: MergeFields = UserMergeFields::from_name(&user.name)
                    .with_email(user.email.as_str())
                    .into();
                let tags = member.tag_names().union(&event_tags);
                self.marketing
                    .update_subscriber(previous_email, &merge_fields, &tags)
                    .await
            }
            None => {
                self.marketing
                    .add_subscriber(&user.email, &user.name, &event_tags)
                    .await
            }
        }
    }

    /// Snapshot of local users in registration order.
    pub async fn list(&self) -> Vec<User> {
        self.directory.list().await
    }

    /// Every member of the marketing list.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Integration` if the platform call fails.
    pub async fn list_remote(&self) -> Result<Vec<RemoteSubscriber>> {
        self.marketing
            .list_all_subscribers()
            .await
            .map_err(|e| AppError::integration(e, REMOTE_LIST_FAILED))
    }

    /// Ping the marketing platform.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Marketing` if the platform is unreachable.
    pub async fn verify_connection(&self) -> Result<()> {
        Ok(self.marketing.verify_connectivity().await?)
    }
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService").finish_non_exhaustive()
    }
}
