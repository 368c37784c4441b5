//! Port to the email-marketing platform.
//!
//! Intake services depend on [`MarketingPlatform`] rather than on the
//! Mailchimp client directly, so tests can substitute a recording fake.

use std::time::Duration;

use async_trait::async_trait;
use cartsync_core::{Email, MergeFields, TagSet};
use thiserror::Error;

use super::mailchimp::RemoteSubscriber;

/// Errors that can occur when talking to the marketing platform.
#[derive(Debug, Clone, Error)]
pub enum MarketingError {
    /// The platform could not be reached (DNS, connect, TLS, reset).
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// The platform did not answer within the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The platform answered with a non-success status.
    #[error("API error: {status} {title} - {detail}")]
    Api {
        status: u16,
        title: String,
        detail: String,
    },

    /// The response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl MarketingError {
    /// Platform-supplied error detail, when the platform sent one.
    #[must_use]
    pub fn platform_detail(&self) -> Option<&str> {
        match self {
            Self::Api { detail, .. } if !detail.is_empty() => Some(detail),
            _ => None,
        }
    }

    /// Whether this is a 404-class answer.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// Outcome of merge-field provisioning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    /// Fields created by this run.
    pub created: Vec<&'static str>,
    /// Fields that were already defined (including create conflicts).
    pub existing: Vec<&'static str>,
    /// Fields that could not be provisioned.
    pub failed: Vec<&'static str>,
}

/// Operations the relay needs from the marketing platform's list-member API.
#[async_trait]
pub trait MarketingPlatform: Send + Sync {
    /// Ping the platform.
    async fn verify_connectivity(&self) -> Result<(), MarketingError>;

    /// Create any missing abandoned-cart merge fields.
    ///
    /// Never fails; problems are logged and listed in the report.
    async fn ensure_schema(&self) -> SchemaReport;

    /// Subscribe `email` with first/last name split from `name`.
    async fn add_subscriber(
        &self,
        email: &Email,
        name: &str,
        tags: &TagSet,
    ) -> Result<RemoteSubscriber, MarketingError>;

    /// Update the member addressed by `email`'s subscriber hash.
    async fn update_subscriber(
        &self,
        email: &Email,
        merge_fields: &MergeFields,
        tags: &TagSet,
    ) -> Result<RemoteSubscriber, MarketingError>;

    /// Fetch a member; `Ok(None)` when the platform reports 404.
    async fn get_subscriber(&self, email: &Email) -> Result<Option<RemoteSubscriber>, MarketingError>;

    /// Every member of the list.
    async fn list_all_subscribers(&self) -> Result<Vec<RemoteSubscriber>, MarketingError>;

    /// Current tag names of a member.
    async fn get_tags(&self, email: &Email) -> Result<TagSet, MarketingError>;
}
