//! The cart state manager.
//!
//! Holds exactly one authoritative cart per session context, applies
//! mutations to it immediately, and persists them through the ordered write
//! queue. Identity changes drive the [`SessionPhase`] machine; signing in
//! merges the anonymous cart into the user's profile cart once.
//!
//! # Ordering
//!
//! The state lock is held for every mutation and for the whole merge. A
//! mutation issued right after sign-in therefore waits until the merge has
//! written the remote cart and cleared local storage, and its own write is
//! queued behind the merge.
//!
//! # Failures
//!
//! Writes never roll back what the caller already saw change. Failures
//! surface through the returned [`WriteHandle`] and as a [`Notification`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use atelier_core::{
    Cart, CartSummary, CatalogSnapshot, LineChange, PopulatedCartLine, ProductId, Size, UserId,
    populate, summarize,
};

use super::notify::{CartEvent, Notification, WriteHandle};
use super::state::{SessionPhase, Transition, plan};
use super::store::{LocalCartStore, RemoteCartStore};
use super::writer::{self, PendingClear, Persistence, Target, WriteJob, WriteOp};
use crate::config::CartConfig;
use crate::error::{CartError, Result, StoreError};
use crate::models::Identity;

/// What a sign-in merge did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Session transition number the merge ran for.
    pub transition: u64,
    /// Distinct lines found in the anonymous cart.
    pub local_lines: usize,
    /// Distinct lines found in the remote cart.
    pub remote_lines: usize,
    /// Distinct lines in the resulting cart.
    pub merged_lines: usize,
    /// Whether the remote cart was written.
    pub remote_written: bool,
    /// Whether the anonymous cart entry was cleared.
    pub local_cleared: bool,
}

/// Cart state manager. Cheaply cloneable; clones share state.
pub struct CartManager<L, R> {
    inner: Arc<ManagerInner<L, R>>,
}

impl<L, R> Clone for CartManager<L, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ManagerInner<L, R> {
    persistence: Arc<Persistence<L, R>>,
    jobs: mpsc::UnboundedSender<WriteJob>,
    state: Mutex<ManagerState>,
    cart_tx: watch::Sender<Cart>,
    phase_tx: watch::Sender<SessionPhase>,
    loading_tx: watch::Sender<bool>,
    catalog: watch::Receiver<Arc<CatalogSnapshot>>,
    transitions: AtomicU64,
}

#[derive(Debug, Default)]
struct ManagerState {
    phase: SessionPhase,
    cart: Cart,
}

impl<L: LocalCartStore, R: RemoteCartStore> CartManager<L, R> {
    /// Start a manager in the anonymous phase.
    ///
    /// Spawns the write queue task and loads the anonymous cart (a missing
    /// entry is an empty cart). Must be called inside a Tokio runtime.
    pub async fn start(
        config: &CartConfig,
        local: L,
        remote: R,
        catalog: watch::Receiver<Arc<CatalogSnapshot>>,
    ) -> Self {
        let (notifications, _) = broadcast::channel(config.notification_capacity.max(1));
        let persistence = Arc::new(Persistence::new(config, local, remote, notifications));
        let (jobs, jobs_rx) = mpsc::unbounded_channel();
        tokio::spawn(writer::run(Arc::clone(&persistence), jobs_rx));

        let manager = Self {
            inner: Arc::new(ManagerInner {
                persistence,
                jobs,
                state: Mutex::new(ManagerState::default()),
                cart_tx: watch::Sender::new(Cart::new()),
                phase_tx: watch::Sender::new(SessionPhase::Anonymous),
                loading_tx: watch::Sender::new(true),
                catalog,
                transitions: AtomicU64::new(0),
            }),
        };

        {
            let mut state = manager.inner.state.lock().await;
            state.cart = manager.load_local().await;
            manager.publish_cart(&state);
        }
        manager.inner.loading_tx.send_replace(false);

        manager
    }

    /// Follow an identity channel, starting with its current value.
    ///
    /// The task ends when the sender side of the channel is dropped.
    pub fn observe(&self, mut identity: watch::Receiver<Identity>) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            loop {
                let current = identity.borrow_and_update().clone();
                if let Err(e) = manager.apply_identity(&current).await {
                    warn!(error = %e, "Session transition failed");
                }
                if identity.changed().await.is_err() {
                    break;
                }
            }
            debug!("Identity channel closed");
        })
    }

    /// Apply one identity event.
    ///
    /// Returns the merge report when the event signed a user in.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Remote` if the remote cart could not be reached;
    /// the manager then stays anonymous. A corrupt remote cart does not fail
    /// the sign-in: the merge replaces it. Returns `CartError::Closed` if the
    /// write queue is gone.
    pub async fn apply_identity(&self, identity: &Identity) -> Result<Option<MergeReport>> {
        let mut state = self.inner.state.lock().await;

        match plan(&state.phase, identity) {
            Transition::Stay => Ok(None),
            Transition::SignIn(user) => self.sign_in(&mut state, user).await.map(Some),
            Transition::SignOut => {
                self.sign_out(&mut state).await;
                Ok(None)
            }
            Transition::Switch(user) => {
                self.sign_out(&mut state).await;
                self.sign_in(&mut state, user).await.map(Some)
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of a product in a size.
    ///
    /// Non-positive quantities are ignored and nothing is written.
    #[instrument(skip(self), fields(product_id = %product_id, size = %size))]
    pub async fn add_line(&self, product_id: ProductId, quantity: i64, size: Size) -> WriteHandle {
        let mut state = self.inner.state.lock().await;

        let event = match state.cart.add(product_id, size, quantity) {
            LineChange::Inserted(line) => CartEvent::LineAdded {
                product_id: line.product_id,
                size: line.size,
                quantity: line.quantity,
            },
            LineChange::Updated { line, previous } => CartEvent::LineAdded {
                quantity: line.quantity.saturating_sub(previous),
                product_id: line.product_id,
                size: line.size,
            },
            _ => {
                debug!(quantity, "Ignoring non-positive add");
                return WriteHandle::ready(Ok(()));
            }
        };

        self.persist(&state, event)
    }

    /// Remove a line. Removing an absent line still persists the cart.
    #[instrument(skip(self), fields(product_id = %product_id, size = %size))]
    pub async fn remove_line(&self, product_id: &ProductId, size: &Size) -> WriteHandle {
        let mut state = self.inner.state.lock().await;

        if !state.cart.remove(product_id, size).is_change() {
            debug!("Line not in cart");
        }
        let event = CartEvent::LineRemoved {
            product_id: product_id.clone(),
            size: size.clone(),
        };
        self.persist(&state, event)
    }

    /// Overwrite a line's quantity; zero or less removes the line.
    ///
    /// A positive quantity for a line that is not in the cart writes nothing.
    #[instrument(skip(self), fields(product_id = %product_id, size = %size))]
    pub async fn set_quantity(
        &self,
        product_id: &ProductId,
        size: &Size,
        quantity: i64,
    ) -> WriteHandle {
        let mut state = self.inner.state.lock().await;

        let event = match state.cart.set_quantity(product_id, size, quantity) {
            LineChange::Updated { line, .. } => CartEvent::QuantityChanged {
                product_id: line.product_id,
                size: line.size,
                quantity: line.quantity,
            },
            LineChange::Removed(_) => CartEvent::LineRemoved {
                product_id: product_id.clone(),
                size: size.clone(),
            },
            _ if quantity <= 0 => CartEvent::LineRemoved {
                product_id: product_id.clone(),
                size: size.clone(),
            },
            _ => match state.cart.line(product_id, size) {
                Some(line) => CartEvent::QuantityChanged {
                    product_id: line.product_id.clone(),
                    size: line.size.clone(),
                    quantity: line.quantity,
                },
                None => {
                    debug!(quantity, "No line to update");
                    self.inner.persistence.notify(
                        CartEvent::LineMissing {
                            product_id: product_id.clone(),
                            size: size.clone(),
                        },
                        Ok(()),
                    );
                    return WriteHandle::ready(Ok(()));
                }
            },
        };

        self.persist(&state, event)
    }

    /// Empty the active cart and persist the empty list.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> WriteHandle {
        let mut state = self.inner.state.lock().await;
        state.cart.clear();
        self.persist(&state, CartEvent::Cleared)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The active cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.inner.cart_tx.borrow().clone()
    }

    /// The active cart joined with the current catalog snapshot.
    #[must_use]
    pub fn populated(&self) -> Vec<PopulatedCartLine> {
        let catalog = Arc::clone(&self.inner.catalog.borrow());
        populate(&self.inner.cart_tx.borrow(), &catalog)
    }

    /// Item count and total over the populated view.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        let catalog = Arc::clone(&self.inner.catalog.borrow());
        summarize(&self.inner.cart_tx.borrow(), &catalog)
    }

    /// The current session phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.inner.phase_tx.borrow().clone()
    }

    /// Whether a load or merge is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        *self.inner.loading_tx.borrow()
    }

    /// Receive the active cart whenever it changes.
    #[must_use]
    pub fn subscribe_cart(&self) -> watch::Receiver<Cart> {
        self.inner.cart_tx.subscribe()
    }

    /// Receive catalog snapshots; recompute [`populated`](Self::populated) on change.
    #[must_use]
    pub fn subscribe_catalog(&self) -> watch::Receiver<Arc<CatalogSnapshot>> {
        self.inner.catalog.clone()
    }

    /// Receive session phase changes.
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<SessionPhase> {
        self.inner.phase_tx.subscribe()
    }

    /// Receive the loading flag.
    #[must_use]
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.inner.loading_tx.subscribe()
    }

    /// Receive a notification for every completed write.
    #[must_use]
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.persistence.subscribe()
    }

    /// Wait until every write issued so far has landed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Closed` if the write queue is gone.
    pub async fn flush(&self) -> Result<()> {
        let _state = self.inner.state.lock().await;
        self.barrier().await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn publish_cart(&self, state: &ManagerState) {
        self.inner.cart_tx.send_replace(state.cart.clone());
    }

    fn set_phase(&self, state: &mut ManagerState, phase: SessionPhase) {
        state.phase = phase.clone();
        self.inner.phase_tx.send_replace(phase);
    }

    /// Publish the cart and queue its write to the authoritative store.
    fn persist(&self, state: &ManagerState, event: CartEvent) -> WriteHandle {
        self.publish_cart(state);

        let target = match state.phase.user() {
            None => Target::Local,
            Some(user) => Target::Remote(user.clone()),
        };
        let op = WriteOp::Save {
            target,
            lines: state.cart.lines().to_vec(),
        };
        self.enqueue(op, Some(event))
    }

    fn enqueue(&self, op: WriteOp, event: Option<CartEvent>) -> WriteHandle {
        let (reply, rx) = oneshot::channel();
        match self.inner.jobs.send(WriteJob { op, event, reply }) {
            Ok(()) => WriteHandle::pending(rx),
            Err(_) => WriteHandle::ready(Err(CartError::Closed)),
        }
    }

    async fn barrier(&self) -> Result<()> {
        self.enqueue(WriteOp::Barrier, None).outcome().await
    }

    /// Read the anonymous cart; unreadable storage yields an empty cart.
    async fn load_local(&self) -> Cart {
        let persistence = &self.inner.persistence;
        match persistence.read_local().await {
            Ok(lines) => {
                let cart = Cart::from_lines(lines.unwrap_or_default());
                persistence.notify(CartEvent::Loaded { lines: cart.len() }, Ok(()));
                cart
            }
            Err(e) => {
                warn!(error = %e, "Anonymous cart unreadable, starting empty");
                persistence.notify(CartEvent::Loaded { lines: 0 }, Err(e));
                Cart::new()
            }
        }
    }

    #[instrument(skip(self, state), fields(user_id = %user))]
    async fn sign_in(&self, state: &mut ManagerState, user: UserId) -> Result<MergeReport> {
        let transition = self.inner.transitions.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_phase(
            state,
            SessionPhase::Authenticating {
                user: user.clone(),
                transition,
            },
        );
        self.inner.loading_tx.send_replace(true);

        let result = self.merge(state, &user, transition).await;

        if result.is_err() {
            self.set_phase(state, SessionPhase::Anonymous);
        }
        self.inner.loading_tx.send_replace(false);
        result
    }

    /// Merge the anonymous cart into the remote cart of `user`.
    async fn merge(
        &self,
        state: &mut ManagerState,
        user: &UserId,
        transition: u64,
    ) -> Result<MergeReport> {
        let persistence = &self.inner.persistence;

        // Land every write issued before the transition
        self.barrier().await?;

        // Unreadable local storage is left alone and merged on a later sign-in
        let local = match persistence.read_local().await {
            Ok(lines) => Cart::from_lines(lines.unwrap_or_default()),
            Err(e) => {
                warn!(error = %e, "Anonymous cart unreadable, merging nothing");
                Cart::new()
            }
        };

        let remote = match persistence.read_remote(user).await {
            Ok(lines) => lines,
            Err(CartError::Remote(e @ StoreError::Corrupt(_))) => {
                // Only a successful write can repair the stored cart
                warn!(transition, error = %e, "Remote cart corrupt, replacing it with the merge");
                persistence.notify(
                    CartEvent::RemoteReplaced { transition },
                    Err(CartError::Remote(e)),
                );
                None
            }
            Err(e) => {
                warn!(transition, error = %e, "Remote cart unreadable, sign-in merge abandoned");
                persistence.notify(CartEvent::MergeFailed { transition }, Err(e.clone()));
                return Err(e);
            }
        };
        let remote_exists = remote.is_some();
        let remote = Cart::from_lines(remote.unwrap_or_default());
        let merged = Cart::merged(&remote, &local);

        let mut report = MergeReport {
            transition,
            local_lines: local.len(),
            remote_lines: remote.len(),
            merged_lines: merged.len(),
            remote_written: false,
            local_cleared: false,
        };

        let write_outcome = if local.is_empty() && remote_exists {
            Ok(())
        } else {
            let outcome = persistence.write_remote(user, merged.lines()).await;
            report.remote_written = outcome.is_ok();
            outcome
        };

        if let Err(e) = &write_outcome {
            warn!(transition, error = %e, "Merged cart not written; anonymous cart kept");
            if !local.is_empty() {
                persistence.mark_pending_clear(PendingClear::AwaitingRemoteWrite);
            }
        } else if !local.is_empty() {
            let clear_outcome = persistence.clear_local().await;
            report.local_cleared = clear_outcome.is_ok();
            if let Err(e) = &clear_outcome {
                warn!(transition, error = %e, "Anonymous cart not cleared after merge");
                persistence.mark_pending_clear(PendingClear::Retry);
            }
            persistence.notify(CartEvent::LocalCleared, clear_outcome);
        }

        persistence.notify(
            CartEvent::Merged {
                transition,
                lines: merged.len(),
            },
            write_outcome,
        );

        state.cart = merged;
        self.publish_cart(state);
        self.set_phase(
            state,
            SessionPhase::Authenticated {
                user: user.clone(),
                transition,
            },
        );

        info!(
            transition,
            local_lines = report.local_lines,
            remote_lines = report.remote_lines,
            merged_lines = report.merged_lines,
            "Cart merged on sign-in"
        );
        Ok(report)
    }

    #[instrument(skip(self, state))]
    async fn sign_out(&self, state: &mut ManagerState) {
        let persistence = &self.inner.persistence;

        if let Err(e) = self.barrier().await {
            warn!(error = %e, "Pending writes not confirmed before sign-out");
        }

        match persistence.pending_clear() {
            Some(PendingClear::Retry) => {
                // The remote cart already holds these lines
                persistence.settle_pending_clear().await;
                if persistence.take_pending_clear().is_some() {
                    warn!("Anonymous cart still holds merged lines");
                }
            }
            Some(PendingClear::AwaitingRemoteWrite) => {
                persistence.take_pending_clear();
                debug!("Merged cart never reached remote storage; keeping anonymous cart");
            }
            None => {}
        }

        state.cart = self.load_local().await;
        self.publish_cart(state);
        self.set_phase(state, SessionPhase::Anonymous);
        info!("Signed out, anonymous cart active");
    }
}
