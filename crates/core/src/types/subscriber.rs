//! Subscriber hash used to address list members on the marketing platform.

use core::fmt;

use md5::{Digest, Md5};
use serde::Serialize;

/// Stable per-member resource identifier.
///
/// MD5 of the lower-cased email address, rendered as lowercase hex. The
/// platform derives member URLs the same way, so this must not change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SubscriberHash(String);

impl SubscriberHash {
    /// Compute the hash for an email address.
    #[must_use]
    pub fn from_email(email: impl AsRef<str>) -> Self {
        let digest = Md5::digest(email.as_ref().to_lowercase().as_bytes());
        Self(hex::encode(digest))
    }

    /// Returns the hash as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SubscriberHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
