//! Integration tests for the cartsync relay.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartsync-integration-tests
//! ```
//!
//! Nothing external is needed: every test starts a fake Mailchimp API
//! ([`MockMailchimp`]) and, where relevant, the relay itself on ephemeral
//! localhost ports.
//!
//! # Test Categories
//!
//! - `mailchimp_client` - `MailchimpClient` against the fake API
//! - `users` - user lifecycle endpoints end to end
//! - `abandoned_cart` - abandoned-cart endpoints end to end

mod mailchimp;

pub use mailchimp::{Endpoint, MockMailchimp};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use cartsync_relay::config::MailchimpConfig;
use cartsync_relay::db::InMemoryDirectory;
use cartsync_relay::routes;
use cartsync_relay::services::MailchimpClient;
use cartsync_relay::state::AppState;
use secrecy::SecretString;
use url::Url;

/// Audience ID every test list uses.
pub const AUDIENCE_ID: &str = "a1b2c3d4e5";

/// Serve `app` on an ephemeral localhost port.
///
/// # Panics
///
/// Panics if the listener cannot be bound.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });

    addr
}

/// Client configuration pointing at `api_root`.
///
/// # Panics
///
/// Panics if `api_root` is not a valid URL.
#[must_use]
pub fn mailchimp_config(api_root: &str, timeout: Duration) -> MailchimpConfig {
    MailchimpConfig {
        api_key: SecretString::from("0123456789abcdef0123456789abcdef-us1".to_string()),
        server_prefix: "us1".to_string(),
        audience_id: AUDIENCE_ID.to_string(),
        base_url: Some(Url::parse(api_root).expect("Invalid API root")),
        timeout,
    }
}

/// A relay wired to a fresh fake Mailchimp, both listening on localhost.
pub struct TestContext {
    pub client: reqwest::Client,
    pub base_url: String,
    pub mailchimp: MockMailchimp,
}

impl TestContext {
    /// Start a fake Mailchimp and a relay pointed at it.
    ///
    /// # Panics
    ///
    /// Panics if either server fails to start.
    pub async fn new() -> Self {
        let mailchimp = MockMailchimp::start().await;
        let config = mailchimp_config(&mailchimp.api_root(), Duration::from_secs(5));
        let marketing = MailchimpClient::new(&config).expect("Failed to build Mailchimp client");

        let state = AppState::new(Arc::new(InMemoryDirectory::new()), Arc::new(marketing));
        let addr = serve(routes::app(state)).await;

        Self {
            client: reqwest::Client::new(),
            base_url: format!("http://{addr}"),
            mailchimp,
        }
    }

    /// Absolute URL of a relay path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}
