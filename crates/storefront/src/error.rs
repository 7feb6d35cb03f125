//! Cart error types.
//!
//! Errors travel through the notification channel as well as through
//! [`WriteHandle`](crate::cart::WriteHandle)s, so every type here is `Clone`.

use thiserror::Error;

use crate::db::RepositoryError;

/// A storage collaborator failed or refused an operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the operation.
    #[error("storage rejected operation: {0}")]
    Rejected(String),

    /// Stored data could not be decoded.
    #[error("stored cart is corrupt: {0}")]
    Corrupt(String),
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => Self::Unavailable(e.to_string()),
            RepositoryError::DataCorruption(msg) => Self::Corrupt(msg),
            RepositoryError::NotFound => Self::Rejected("record not found".to_owned()),
        }
    }
}

impl From<tower_sessions::session::Error> for StoreError {
    fn from(err: tower_sessions::session::Error) -> Self {
        match err {
            tower_sessions::session::Error::SerdeJson(e) => Self::Corrupt(e.to_string()),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Errors surfaced by the cart manager.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    /// The local (anonymous) cart backend failed.
    #[error("local cart storage failed: {0}")]
    Local(StoreError),

    /// The remote (profile) cart backend failed.
    #[error("remote cart storage failed: {0}")]
    Remote(StoreError),

    /// The write queue has shut down.
    #[error("cart manager has shut down")]
    Closed,
}

impl CartError {
    /// Returns true if the failure came from a storage backend.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Local(_) | Self::Remote(_))
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_display() {
        let err = CartError::Remote(StoreError::Unavailable("timeout".to_string()));
        assert_eq!(
            err.to_string(),
            "remote cart storage failed: storage unavailable: timeout"
        );
        assert!(err.is_storage());
        assert!(!CartError::Closed.is_storage());
    }

    #[test]
    fn test_repository_error_mapping() {
        let err = StoreError::from(RepositoryError::DataCorruption("bad json".to_string()));
        assert_eq!(err, StoreError::Corrupt("bad json".to_string()));

        let err = StoreError::from(RepositoryError::NotFound);
        assert!(matches!(err, StoreError::Rejected(_)));
    }
}
