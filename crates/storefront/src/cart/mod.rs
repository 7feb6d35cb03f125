//! Cart state management.
//!
//! [`CartManager`] owns the active cart for one session context and keeps
//! it in step with the identity stream: the anonymous cart lives in a
//! [`LocalCartStore`], the signed-in cart in a [`RemoteCartStore`].

pub mod manager;
pub mod memory;
pub mod notify;
pub mod session_store;
pub mod state;
pub mod store;
mod writer;

pub use manager::{CartManager, MergeReport};
pub use memory::{MemoryLocalStore, MemoryRemoteStore};
pub use notify::{CartEvent, Notification, WriteHandle};
pub use session_store::SessionCartStore;
pub use state::{CartAuthority, SessionPhase};
pub use store::{LocalCartStore, RemoteCartStore};
