//! Audience member operations.

use cartsync_core::{Email, MergeFields, SubscriberHash, TagSet, UserMergeFields};
use reqwest::Method;
use tracing::instrument;

use super::{
    MailchimpClient, MemberList, MemberTagList, MemberUpdate, NewMember, Ping, RemoteSubscriber,
    TagUpdate,
};
use crate::services::marketing::MarketingError;

/// Largest page the members endpoint serves.
const PAGE_SIZE: usize = 1000;

impl MailchimpClient {
    /// Ping the API.
    ///
    /// # Errors
    ///
    /// Returns error if the platform is unreachable or rejects the key.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), MarketingError> {
        match self.get::<Ping>("/ping").await {
            Ok(ping) => {
                tracing::info!(health_status = %ping.health_status, "Mailchimp connection verified");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to Mailchimp");
                // Any failed ping means the platform is not usable
                if matches!(e, MarketingError::Api { .. } | MarketingError::Parse(_)) {
                    Err(MarketingError::Connectivity(e.to_string()))
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Subscribe a new member.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails, including when the member
    /// already exists.
    #[instrument(skip(self, tags), fields(email = %email))]
    pub async fn add_member(
        &self,
        email: &Email,
        name: &str,
        tags: &TagSet,
    ) -> Result<RemoteSubscriber, MarketingError> {
        tracing::info!("Adding user to Mailchimp list");

        let merge_fields = UserMergeFields::from_name(name);
        let body = NewMember {
            email_address: email.as_str(),
            status: "subscribed",
            merge_fields: &merge_fields,
            tags,
        };

        let path = format!("/lists/{}/members", self.list_id());
        let member: RemoteSubscriber = self
            .send_json(Method::POST, &path, &body)
            .await
            .inspect_err(|e| log_failure("Failed to add subscriber to Mailchimp", e))?;

        tracing::info!(subscriber_hash = %member.id, "Successfully added subscriber");
        Ok(member)
    }

    /// Update merge fields and activate `tags` on an existing member.
    ///
    /// # Errors
    ///
    /// Returns error if either API request fails.
    #[instrument(skip(self, merge_fields, tags), fields(email = %email))]
    pub async fn update_member(
        &self,
        email: &Email,
        merge_fields: &MergeFields,
        tags: &TagSet,
    ) -> Result<RemoteSubscriber, MarketingError> {
        tracing::info!("Updating subscriber in Mailchimp");

        let path = self.member_path(email);
        let member: RemoteSubscriber = self
            .send_json(Method::PATCH, &path, &MemberUpdate { merge_fields })
            .await
            .inspect_err(|e| log_failure("Failed to update subscriber in Mailchimp", e))?;

        if !tags.is_empty() {
            self.post_no_content(&format!("{path}/tags"), &TagUpdate::activate(tags))
                .await
                .inspect_err(|e| log_failure("Failed to update subscriber tags in Mailchimp", e))?;
        }

        tracing::info!(tags = ?tags, "Successfully updated subscriber");
        Ok(member)
    }

    /// Fetch a member, treating 404 as absent.
    ///
    /// # Errors
    ///
    /// Returns error for any failure other than a 404.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn get_member(&self, email: &Email) -> Result<Option<RemoteSubscriber>, MarketingError> {
        match self.get(&self.member_path(email)).await {
            Ok(member) => {
                tracing::info!("Retrieved subscriber from Mailchimp");
                Ok(Some(member))
            }
            Err(e) if e.is_not_found() => {
                tracing::info!("Subscriber not found in Mailchimp");
                Ok(None)
            }
            Err(e) => {
                log_failure("Failed to get subscriber from Mailchimp", &e);
                Err(e)
            }
        }
    }

    /// Fetch every member of the list, following pagination.
    ///
    /// # Errors
    ///
    /// Returns error if any page request fails.
    #[instrument(skip(self))]
    pub async fn list_members(&self) -> Result<Vec<RemoteSubscriber>, MarketingError> {
        let mut members = Vec::new();

        loop {
            let path = format!(
                "/lists/{}/members?count={PAGE_SIZE}&offset={}",
                self.list_id(),
                members.len()
            );
            let page: MemberList = self
                .get(&path)
                .await
                .inspect_err(|e| log_failure("Failed to get members from Mailchimp list", e))?;

            let fetched = page.members.len();
            members.extend(page.members);

            if fetched == 0 || members.len() as u64 >= page.total_items {
                break;
            }
        }

        tracing::info!(count = members.len(), "Retrieved members from Mailchimp list");
        Ok(members)
    }

    /// Current tag names of a member.
    ///
    /// # Errors
    ///
    /// Returns error if the member lookup fails, including a 404.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn member_tags(&self, email: &Email) -> Result<TagSet, MarketingError> {
        let path = format!("{}/tags?count={PAGE_SIZE}", self.member_path(email));
        let list: MemberTagList = self
            .get(&path)
            .await
            .inspect_err(|e| log_failure("Failed to get member tags", e))?;

        let tags: TagSet = list.tags.into_iter().map(|t| t.name).collect();
        tracing::debug!(tags = ?tags, "Fetched member tags");
        Ok(tags)
    }

    fn member_path(&self, email: &Email) -> String {
        format!(
            "/lists/{}/members/{}",
            self.list_id(),
            SubscriberHash::from_email(email)
        )
    }
}

fn log_failure(message: &str, err: &MarketingError) {
    match err.platform_detail() {
        Some(detail) => tracing::error!(error = %err, detail, "{message}"),
        None => tracing::error!(error = %err, "{message}"),
    }
}
