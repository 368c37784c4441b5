//! Abandoned-cart intake.

use std::sync::Arc;

use cartsync_core::{CartMergeFields, Email, MergeFields, TagSet};
use tracing::instrument;

use super::mailchimp::RemoteSubscriber;
use super::marketing::MarketingPlatform;
use crate::error::{AppError, Result};
use crate::models::AbandonedCart;

/// Relays abandoned carts onto the marketing list.
#[derive(Clone)]
pub struct AbandonedCartService {
    marketing: Arc<dyn MarketingPlatform>,
}

impl AbandonedCartService {
    #[must_use]
    pub fn new(marketing: Arc<dyn MarketingPlatform>) -> Self {
        Self { marketing }
    }

    /// Write the cart's merge fields and tags onto the member for its email.
    ///
    /// Tags already on the member are kept; the event's tags (or the
    /// default cart tag) are added. The member must already exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a missing or malformed email, and
    /// `AppError::Marketing` for any platform failure, including an unknown
    /// member.
    #[instrument(skip(self, cart), fields(cart_id = %cart.cart_id))]
    pub async fn record(&self, cart: &AbandonedCart) -> Result<RemoteSubscriber> {
        let email = Email::parse(cart.email.as_deref().unwrap_or_default())
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let existing = self.marketing.get_tags(&email).await?;

        let merge_fields: MergeFields = CartMergeFields::new(
            &cart.customer_name,
            &cart.cart_id,
            &cart.cart_items,
            cart.total_price,
            &cart.abandonment_timestamp,
            &cart.return_url,
        )
        .into();
        let tags = existing.union(&cart.event_tags().into_iter().collect::<TagSet>());

        let member = self
            .marketing
            .update_subscriber(&email, &merge_fields, &tags)
            .await?;
        tracing::info!(email = %email, "Abandoned cart recorded");

        match self.marketing.get_tags(&email).await {
            Ok(current) => tracing::info!(tags = ?current, "Member tags after cart update"),
            Err(e) => tracing::warn!(error = %e, "Could not re-fetch member tags"),
        }

        Ok(member)
    }
}

impl std::fmt::Debug for AbandonedCartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbandonedCartService").finish_non_exhaustive()
    }
}
