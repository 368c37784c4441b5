//! Business logic services for the relay.
//!
//! # Services
//!
//! - `marketing` - Port to the email-marketing platform
//! - `mailchimp` - Mailchimp implementation of that port
//! - `users` - User lifecycle intake (register, update, list)
//! - `abandoned_cart` - Abandoned-cart intake

pub mod abandoned_cart;
pub mod mailchimp;
pub mod marketing;
pub mod users;

#[cfg(test)]
pub(crate) mod fake;

pub use abandoned_cart::AbandonedCartService;
pub use mailchimp::{MailchimpClient, RemoteSubscriber};
pub use marketing::{MarketingError, MarketingPlatform, SchemaReport};
pub use users::UserService;
