//! User-visible notifications and observable write results.
//!
//! Every persistence write produces one [`Notification`], on the success path
//! and on the failure path alike. UIs turn them into toasts; tests subscribe
//! to them to observe failures that callers chose not to await.

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use atelier_core::{ProductId, Size};

use crate::error::CartError;

/// What a notification is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// The active cart was read from storage.
    Loaded { lines: usize },
    /// Units were added to a line.
    LineAdded {
        product_id: ProductId,
        size: Size,
        quantity: u32,
    },
    /// A line was removed (or a removal of an absent line was persisted).
    LineRemoved { product_id: ProductId, size: Size },
    /// A line's quantity was overwritten.
    QuantityChanged {
        product_id: ProductId,
        size: Size,
        quantity: u32,
    },
    /// The active cart was emptied.
    Cleared,
    /// The anonymous cart was merged into the user's remote cart.
    Merged { transition: u64, lines: usize },
    /// A sign-in could not read the remote cart and was abandoned.
    MergeFailed { transition: u64 },
    /// The stored remote cart was unreadable and is replaced by the merge.
    RemoteReplaced { transition: u64 },
    /// A quantity was set on a line that is not in the cart.
    LineMissing { product_id: ProductId, size: Size },
    /// The anonymous cart entry was removed after a merge.
    LocalCleared,
}

impl CartEvent {
    /// Short message for the success path.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Loaded { lines } => format!("Cart restored ({lines} items)"),
            Self::LineAdded { quantity, .. } => format!("Added {quantity} to cart"),
            Self::LineRemoved { .. } => "Removed from cart".to_string(),
            Self::QuantityChanged { quantity, .. } => format!("Quantity updated to {quantity}"),
            Self::Cleared => "Cart cleared".to_string(),
            Self::Merged { .. } => "Cart synced to your account".to_string(),
            Self::MergeFailed { .. } => "Could not sync your cart".to_string(),
            Self::RemoteReplaced { .. } => "Saved cart was unreadable and was replaced".to_string(),
            Self::LineMissing { .. } => "Item is no longer in your cart".to_string(),
            Self::LocalCleared => "Guest cart cleared".to_string(),
        }
    }
}

/// One notification, emitted after a write completes.
#[derive(Debug, Clone)]
pub struct Notification {
    pub event: CartEvent,
    pub outcome: Result<(), CartError>,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub(crate) fn new(event: CartEvent, outcome: Result<(), CartError>) -> Self {
        Self {
            event,
            outcome,
            at: Utc::now(),
        }
    }

    /// Returns true if the write succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Message to show the user.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.outcome {
            Ok(()) => self.event.message(),
            Err(e) => format!("Something went wrong saving your cart: {e}"),
        }
    }
}

/// Result of a persistence write that the caller may await or drop.
///
/// Dropping the handle does not cancel the write; it only discards the
/// caller's view of the outcome. The outcome is also broadcast as a
/// [`Notification`].
#[derive(Debug)]
pub struct WriteHandle {
    state: HandleState,
}

#[derive(Debug)]
enum HandleState {
    Ready(Result<(), CartError>),
    Pending(oneshot::Receiver<Result<(), CartError>>),
}

impl WriteHandle {
    pub(crate) const fn ready(outcome: Result<(), CartError>) -> Self {
        Self {
            state: HandleState::Ready(outcome),
        }
    }

    pub(crate) const fn pending(rx: oneshot::Receiver<Result<(), CartError>>) -> Self {
        Self {
            state: HandleState::Pending(rx),
        }
    }

    /// Wait for the write to land.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the write failed, or `CartError::Closed`
    /// if the write queue shut down before running it.
    pub async fn outcome(self) -> Result<(), CartError> {
        match self.state {
            HandleState::Ready(outcome) => outcome,
            HandleState::Pending(rx) => rx.await.unwrap_or(Err(CartError::Closed)),
        }
    }
}
