//! Ordered write queue and storage access.
//!
//! All cart writes go through one queue task, so storage sees them in the
//! order the user made them. The manager enqueues while holding its state
//! lock; a [`WriteOp::Barrier`] therefore tells the manager that every write
//! issued before it has landed.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use atelier_core::{CartLine, UserId};

use super::notify::{CartEvent, Notification};
use super::store::{LocalCartStore, RemoteCartStore};
use crate::config::CartConfig;
use crate::error::{CartError, StoreError};

/// Where a save goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Local,
    Remote(UserId),
}

/// One queued operation.
#[derive(Debug)]
pub(crate) enum WriteOp {
    Save { target: Target, lines: Vec<CartLine> },
    Barrier,
}

pub(crate) struct WriteJob {
    pub op: WriteOp,
    pub event: Option<CartEvent>,
    pub reply: oneshot::Sender<Result<(), CartError>>,
}

/// Why the anonymous cart still needs clearing after a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PendingClear {
    /// The merge write failed; the remote cart lacks the anonymous lines.
    AwaitingRemoteWrite,
    /// The remote cart has the anonymous lines but the clear failed.
    Retry,
}

/// Storage collaborators plus the policy for talking to them.
pub(crate) struct Persistence<L, R> {
    local: L,
    remote: R,
    key: String,
    clear_attempts: u32,
    read_attempts: u32,
    retry_delay: Duration,
    pending_clear: Mutex<Option<PendingClear>>,
    notifications: broadcast::Sender<Notification>,
}

impl<L: LocalCartStore, R: RemoteCartStore> Persistence<L, R> {
    pub fn new(
        config: &CartConfig,
        local: L,
        remote: R,
        notifications: broadcast::Sender<Notification>,
    ) -> Self {
        Self {
            local,
            remote,
            key: config.storage_key.clone(),
            clear_attempts: config.clear_attempts.max(1),
            read_attempts: config.read_attempts.max(1),
            retry_delay: config.retry_delay,
            pending_clear: Mutex::new(None),
            notifications,
        }
    }

    pub fn notify(&self, event: CartEvent, outcome: Result<(), CartError>) {
        // No subscribers is fine
        let _ = self.notifications.send(Notification::new(event, outcome));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub async fn read_local(&self) -> Result<Option<Vec<CartLine>>, CartError> {
        self.local.read(&self.key).await.map_err(CartError::Local)
    }

    /// Read the remote cart, retrying transient failures.
    ///
    /// A corrupt cart is returned at once; reading it again cannot help.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn read_remote(&self, user: &UserId) -> Result<Option<Vec<CartLine>>, CartError> {
        let mut attempt = 1;
        loop {
            match self.remote.read_cart(user).await {
                Ok(lines) => return Ok(lines),
                Err(e @ StoreError::Corrupt(_)) => return Err(CartError::Remote(e)),
                Err(e) if attempt < self.read_attempts => {
                    warn!(attempt, error = %e, "Remote cart read failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(CartError::Remote(e)),
            }
        }
    }

    pub async fn write_remote(&self, user: &UserId, lines: &[CartLine]) -> Result<(), CartError> {
        self.remote
            .write_cart(user, lines)
            .await
            .map_err(CartError::Remote)
    }

    /// Remove the anonymous cart entry.
    ///
    /// Deletion is retried; if it keeps failing the entry is overwritten
    /// with an empty list instead.
    #[instrument(skip(self))]
    pub async fn clear_local(&self) -> Result<(), CartError> {
        for attempt in 1..=self.clear_attempts {
            match self.local.delete(&self.key).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, error = %e, "Anonymous cart delete failed");
                    if attempt < self.clear_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        self.local
            .write(&self.key, &[])
            .await
            .map_err(CartError::Local)
    }

    pub fn mark_pending_clear(&self, pending: PendingClear) {
        *self
            .pending_clear
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(pending);
    }

    pub fn pending_clear(&self) -> Option<PendingClear> {
        *self
            .pending_clear
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn take_pending_clear(&self) -> Option<PendingClear> {
        self.pending_clear
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Clear the anonymous cart if a merge left it behind.
    ///
    /// Only called once the remote cart is known to hold the merged lines.
    pub async fn settle_pending_clear(&self) {
        let Some(pending) = self.take_pending_clear() else {
            return;
        };

        let outcome = self.clear_local().await;
        match &outcome {
            Ok(()) => info!(?pending, "Anonymous cart cleared after delayed merge"),
            Err(e) => {
                warn!(error = %e, "Anonymous cart still not cleared; will retry");
                self.mark_pending_clear(PendingClear::Retry);
            }
        }
        self.notify(CartEvent::LocalCleared, outcome);
    }

    async fn execute(&self, op: WriteOp) -> Result<(), CartError> {
        match op {
            WriteOp::Save {
                target: Target::Local,
                lines,
            } => self
                .local
                .write(&self.key, &lines)
                .await
                .map_err(CartError::Local),
            WriteOp::Save {
                target: Target::Remote(user),
                lines,
            } => {
                self.write_remote(&user, &lines).await?;
                self.settle_pending_clear().await;
                Ok(())
            }
            WriteOp::Barrier => Ok(()),
        }
    }
}

/// Run the write queue until every sender is dropped.
pub(crate) async fn run<L: LocalCartStore, R: RemoteCartStore>(
    persistence: Arc<Persistence<L, R>>,
    mut jobs: mpsc::UnboundedReceiver<WriteJob>,
) {
    while let Some(job) = jobs.recv().await {
        let outcome = persistence.execute(job.op).await;

        if let Some(event) = job.event {
            match &outcome {
                Ok(()) => debug!(?event, "Cart write succeeded"),
                Err(e) => warn!(?event, error = %e, "Cart write failed"),
            }
            persistence.notify(event, outcome.clone());
        }

        // The caller may have dropped its handle
        let _ = job.reply.send(outcome);
    }

    debug!("Cart write queue closed");
}
