//! Session phase state machine.
//!
//! ```text
//!              SignedIn(u)                 merge done
//! Anonymous ───────────────► Authenticating ──────────► Authenticated(u)
//!     ▲                            │ remote read failed        │
//!     └────────────────────────────┘                           │
//!     └─────────────────────────── SignedOut ──────────────────┘
//! ```
//!
//! There is no terminal state. `SignedIn(v)` while authenticated as `u`
//! is handled as a sign-out followed by a sign-in.

use serde::Serialize;

use atelier_core::UserId;

use crate::models::Identity;

/// Which session context currently owns the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    /// No authenticated session; local storage is the source of truth.
    #[default]
    Anonymous,
    /// A sign-in merge is in flight.
    Authenticating { user: UserId, transition: u64 },
    /// The user's profile cart is the source of truth.
    Authenticated { user: UserId, transition: u64 },
}

/// Where the authoritative cart lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAuthority {
    Local,
    Remote(UserId),
    /// Momentarily ambiguous while a merge runs.
    Pending,
}

impl SessionPhase {
    /// The authoritative storage for this phase.
    #[must_use]
    pub fn authority(&self) -> CartAuthority {
        match self {
            Self::Anonymous => CartAuthority::Local,
            Self::Authenticating { .. } => CartAuthority::Pending,
            Self::Authenticated { user, .. } => CartAuthority::Remote(user.clone()),
        }
    }

    /// The user this phase belongs to, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticating { user, .. } | Self::Authenticated { user, .. } => Some(user),
        }
    }

    /// Transition number, zero while anonymous.
    #[must_use]
    pub const fn transition(&self) -> u64 {
        match self {
            Self::Anonymous => 0,
            Self::Authenticating { transition, .. } | Self::Authenticated { transition, .. } => {
                *transition
            }
        }
    }

    /// Returns true once the merge for this session has completed.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// What an identity event requires from the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transition {
    /// Already in the right phase.
    Stay,
    SignIn(UserId),
    SignOut,
    /// A different user signed in without a sign-out in between.
    Switch(UserId),
}

/// Decide the transition for an identity event.
pub(crate) fn plan(phase: &SessionPhase, identity: &Identity) -> Transition {
    match (phase.user(), identity) {
        (None, Identity::SignedOut) => Transition::Stay,
        (None, Identity::SignedIn(user)) => Transition::SignIn(user.clone()),
        (Some(_), Identity::SignedOut) => Transition::SignOut,
        (Some(current), Identity::SignedIn(user)) if current == user => Transition::Stay,
        (Some(_), Identity::SignedIn(user)) => Transition::Switch(user.clone()),
    }
}
