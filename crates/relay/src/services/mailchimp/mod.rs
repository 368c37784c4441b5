//! Mailchimp Marketing API client for audience (list) member management.
//!
//! # Supported Features
//!
//! - **Connectivity**: `GET /ping`
//! - **Schema**: provisioning of the abandoned-cart merge fields
//! - **Members**: create, update, fetch and list audience members
//! - **Tags**: read and activate member tags
//!
//! # API Reference
//!
//! - Base URL: `https://<server-prefix>.api.mailchimp.com/3.0`
//! - Authentication: HTTP Basic, any username, API key as password
//! - Members are addressed by the MD5 of the lower-cased email

mod members;
mod schema;
mod types;

pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cartsync_core::{Email, MergeFields, TagSet};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};

use super::marketing::{MarketingError, MarketingPlatform, SchemaReport};
use crate::config::MailchimpConfig;

/// Username sent with Basic auth; the platform only checks the password.
const AUTH_USER: &str = "cartsync";

/// Mailchimp Marketing API client.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct MailchimpClient {
    inner: Arc<MailchimpClientInner>,
}

struct MailchimpClientInner {
    client: reqwest::Client,
    api_root: String,
    api_key: SecretString,
    list_id: String,
    timeout: Duration,
}

impl MailchimpClient {
    /// Create a new Mailchimp API client.
    ///
    /// Every request made by the client is bounded by `config.timeout`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &MailchimpConfig) -> Result<Self, MarketingError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MarketingError::Connectivity(format!("failed to build client: {e}")))?;

        Ok(Self {
            inner: Arc::new(MailchimpClientInner {
                client,
                api_root: config.api_root(),
                api_key: config.api_key.clone(),
                list_id: config.audience_id.clone(),
                timeout: config.timeout,
            }),
        })
    }

    /// Get the configured audience (list) ID.
    #[must_use]
    pub fn list_id(&self) -> &str {
        &self.inner.list_id
    }

    /// Build an authenticated request for `path` under the API root.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.inner.api_root);
        self.inner
            .client
            .request(method, url)
            .basic_auth(AUTH_USER, Some(self.inner.api_key.expose_secret()))
    }

    /// Execute a GET request and parse the JSON body.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, MarketingError> {
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        self.handle_response(response).await
    }

    /// Execute a request with a JSON body and parse the JSON response.
    pub(crate) async fn send_json<T, B>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, MarketingError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + Sync + ?Sized,
    {
        let response = self
            .request(method, path)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        self.handle_response(response).await
    }

    /// Execute a POST whose success response has no body (204).
    pub(crate) async fn post_no_content<B: serde::Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), MarketingError> {
        let response = self
            .request(Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(Self::parse_error(response).await)
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, MarketingError> {
        if response.status().is_success() {
            return response.json().await.map_err(|e| {
                if e.is_timeout() {
                    MarketingError::Timeout(self.inner.timeout)
                } else {
                    MarketingError::Parse(format!("Failed to parse response: {e}"))
                }
            });
        }

        Err(Self::parse_error(response).await)
    }

    /// Classify a failure to get any response at all.
    fn transport_error(&self, err: &reqwest::Error) -> MarketingError {
        if err.is_timeout() {
            MarketingError::Timeout(self.inner.timeout)
        } else {
            MarketingError::Connectivity(err.to_string())
        }
    }

    /// Parse a problem-detail error response.
    async fn parse_error(response: reqwest::Response) -> MarketingError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let problem = serde_json::from_str::<ProblemDetail>(&body).unwrap_or_default();

        MarketingError::Api {
            status: status.as_u16(),
            title: problem
                .title
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string()),
            detail: problem.detail.unwrap_or(body),
        }
    }
}

impl std::fmt::Debug for MailchimpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailchimpClient")
            .field("api_root", &self.inner.api_root)
            .field("list_id", &self.inner.list_id)
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MarketingPlatform for MailchimpClient {
    async fn verify_connectivity(&self) -> Result<(), MarketingError> {
        self.ping().await
    }

    async fn ensure_schema(&self) -> SchemaReport {
        self.ensure_merge_fields().await
    }

    async fn add_subscriber(
        &self,
        email: &Email,
        name: &str,
        tags: &TagSet,
    ) -> Result<RemoteSubscriber, MarketingError> {
        self.add_member(email, name, tags).await
    }

    async fn update_subscriber(
        &self,
        email: &Email,
        merge_fields: &MergeFields,
        tags: &TagSet,
    ) -> Result<RemoteSubscriber, MarketingError> {
        self.update_member(email, merge_fields, tags).await
    }

    async fn get_subscriber(&self, email: &Email) -> Result<Option<RemoteSubscriber>, MarketingError> {
        self.get_member(email).await
    }

    async fn list_all_subscribers(&self) -> Result<Vec<RemoteSubscriber>, MarketingError> {
        self.list_members().await
    }

    async fn get_tags(&self, email: &Email) -> Result<TagSet, MarketingError> {
        self.member_tags(email).await
    }
}
