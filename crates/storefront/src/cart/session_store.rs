//! Anonymous cart storage in a `tower-sessions` session.
//!
//! The server-side counterpart of browser-local storage: one session per
//! visitor, the cart list under the namespaced key.

use serde_json::Value;
use tower_sessions::Session;

use atelier_core::CartLine;

use super::store::{LocalCartStore, decode_lines};
use crate::error::StoreError;

/// Local cart store over a visitor session.
#[derive(Debug, Clone)]
pub struct SessionCartStore {
    session: Session,
}

impl SessionCartStore {
    /// Wrap a session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl LocalCartStore for SessionCartStore {
    async fn read(&self, key: &str) -> Result<Option<Vec<CartLine>>, StoreError> {
        self.session
            .get::<Value>(key)
            .await?
            .map(decode_lines)
            .transpose()
    }

    async fn write(&self, key: &str, lines: &[CartLine]) -> Result<(), StoreError> {
        self.session.insert(key, lines).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.session.remove_value(key).await?;
        Ok(())
    }
}
