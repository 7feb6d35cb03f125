//! Session-related types.
//!
//! The identity the auth collaborator reports, and the keys the cart uses in
//! session-scoped storage.

use serde::{Deserialize, Serialize};

use atelier_core::UserId;

/// Who the current session belongs to.
///
/// Emitted by the auth collaborator whenever it changes; the cart manager
/// only ever sees it through an explicit channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "user_id", rename_all = "snake_case")]
pub enum Identity {
    /// No authenticated session.
    #[default]
    SignedOut,
    /// An authenticated user.
    SignedIn(UserId),
}

impl Identity {
    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&UserId> {
        match self {
            Self::SignedOut => None,
            Self::SignedIn(user) => Some(user),
        }
    }
}

/// Session keys for cart data.
pub mod keys {
    /// Key of the anonymous cart in session-scoped storage.
    ///
    /// One anonymous cart per browser profile.
    pub const ANONYMOUS_CART: &str = "atelier.cart";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_user() {
        assert_eq!(Identity::SignedOut.user(), None);
        let user = UserId::new("u1");
        assert_eq!(Identity::SignedIn(user.clone()).user(), Some(&user));
    }

    #[test]
    fn test_identity_serde() {
        let json = serde_json::to_string(&Identity::SignedIn(UserId::new("u1"))).unwrap();
        assert_eq!(json, r#"{"state":"signed_in","user_id":"u1"}"#);

        let parsed: Identity = serde_json::from_str(r#"{"state":"signed_out"}"#).unwrap();
        assert_eq!(parsed, Identity::SignedOut);
    }
}
