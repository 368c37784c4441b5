//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::SubscriberDirectory;
use crate::services::{AbandonedCartService, MarketingPlatform, UserService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and gives handlers the intake
/// services plus the raw platform port for health checks.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    marketing: Arc<dyn MarketingPlatform>,
    users: UserService,
    carts: AbandonedCartService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `directory` - Local user store
    /// * `marketing` - Marketing platform the intake services relay to
    #[must_use]
    pub fn new(
        directory: Arc<dyn SubscriberDirectory>,
        marketing: Arc<dyn MarketingPlatform>,
    ) -> Self {
        let users = UserService::new(directory, marketing.clone());
        let carts = AbandonedCartService::new(marketing.clone());

        Self {
            inner: Arc::new(AppStateInner {
                marketing,
                users,
                carts,
            }),
        }
    }

    /// Get a reference to the marketing platform port.
    #[must_use]
    pub fn marketing(&self) -> &dyn MarketingPlatform {
        self.inner.marketing.as_ref()
    }

    /// Get a reference to the user intake service.
    #[must_use]
    pub fn users(&self) -> &UserService {
        &self.inner.users
    }

    /// Get a reference to the abandoned-cart intake service.
    #[must_use]
    pub fn carts(&self) -> &AbandonedCartService {
        &self.inner.carts
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
