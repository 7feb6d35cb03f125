//! In-process cart stores.
//!
//! Used by tests and local development. Both stores are cheaply cloneable
//! handles onto shared state and expose switches for injecting failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use atelier_core::{CartLine, UserId};

use super::store::{LocalCartStore, RemoteCartStore};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Switches {
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    failing_reads_left: AtomicU32,
    write_delay_ms: AtomicU32,
    writes: AtomicUsize,
}

impl Switches {
    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        let consumed = self
            .failing_reads_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok();
        if consumed {
            return Err(StoreError::Unavailable("transient read failure".to_string()));
        }
        Ok(())
    }

    async fn check_write(&self) -> Result<(), StoreError> {
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(u64::from(delay))).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("writes disabled".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn check_delete(&self) -> Result<(), StoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("deletes disabled".to_string()));
        }
        Ok(())
    }
}

/// Local (anonymous) cart storage backed by a map.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocalStore {
    entries: Arc<Mutex<HashMap<String, Vec<CartLine>>>>,
    switches: Arc<Switches>,
}

impl MemoryLocalStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<CartLine>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Seed a value under `key`.
    pub fn insert(&self, key: &str, lines: Vec<CartLine>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), lines);
    }

    /// Make every read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.switches.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.switches.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every delete fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.switches.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.switches.writes.load(Ordering::SeqCst)
    }
}

impl LocalCartStore for MemoryLocalStore {
    async fn read(&self, key: &str) -> Result<Option<Vec<CartLine>>, StoreError> {
        self.switches.check_read()?;
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, lines: &[CartLine]) -> Result<(), StoreError> {
        self.switches.check_write().await?;
        self.insert(key, lines.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.switches.check_delete()?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Remote (profile) cart storage backed by a map keyed by user.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    carts: Arc<Mutex<HashMap<UserId, Vec<CartLine>>>>,
    switches: Arc<Switches>,
}

impl MemoryRemoteStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cart field of `user`.
    #[must_use]
    pub fn get(&self, user: &UserId) -> Option<Vec<CartLine>> {
        self.carts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
            .cloned()
    }

    /// Seed the cart field of `user`.
    pub fn insert(&self, user: &UserId, lines: Vec<CartLine>) {
        self.carts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.clone(), lines);
    }

    /// Make every read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.switches.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` reads fail, then succeed again.
    pub fn fail_next_reads(&self, count: u32) {
        self.switches
            .failing_reads_left
            .store(count, Ordering::SeqCst);
    }

    /// Make every write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.switches.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delay every write, simulating a slow backend.
    pub fn set_write_delay(&self, delay: Duration) {
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        self.switches.write_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.switches.writes.load(Ordering::SeqCst)
    }
}

impl RemoteCartStore for MemoryRemoteStore {
    async fn read_cart(&self, user: &UserId) -> Result<Option<Vec<CartLine>>, StoreError> {
        self.switches.check_read()?;
        Ok(self.get(user))
    }

    async fn write_cart(&self, user: &UserId, lines: &[CartLine]) -> Result<(), StoreError> {
        self.switches.check_write().await?;
        self.insert(user, lines.to_vec());
        Ok(())
    }
}
