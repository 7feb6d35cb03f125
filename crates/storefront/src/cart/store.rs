//! Storage collaborator surfaces consumed by the cart manager.
//!
//! Implementations must be thread-safe (`Send + Sync`). Every method returns
//! a `Send` future so stores can be driven from the write queue task.

use std::future::Future;

use serde_json::Value;
use tracing::warn;

use atelier_core::{CartLine, UserId};

use crate::error::StoreError;

/// Key-value storage for the anonymous cart (browser-scoped in the web client).
pub trait LocalCartStore: Send + Sync + 'static {
    /// Read the list stored under `key`, if any.
    fn read(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<CartLine>>, StoreError>> + Send;

    /// Replace the list stored under `key`.
    fn write(
        &self,
        key: &str,
        lines: &[CartLine],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove the entry under `key`. Removing an absent key succeeds.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// The `cart` field of an authenticated user's profile record.
///
/// Writes are partial updates: only the cart field changes, the rest of the
/// profile is left alone.
pub trait RemoteCartStore: Send + Sync + 'static {
    /// Read the user's cart field. `None` when the profile or field is absent.
    fn read_cart(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<Vec<CartLine>>, StoreError>> + Send;

    /// Overwrite the user's cart field.
    fn write_cart(
        &self,
        user: &UserId,
        lines: &[CartLine],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Decode a stored cart list line by line.
///
/// Lines that do not decode (negative quantities, missing product IDs) are
/// skipped so the rest of the cart survives. Anything but a JSON array is
/// corrupt.
///
/// # Errors
///
/// Returns `StoreError::Corrupt` if `value` is not an array.
pub fn decode_lines(value: Value) -> Result<Vec<CartLine>, StoreError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(StoreError::Corrupt(format!(
                "expected a list of cart lines, found {other}"
            )));
        }
    };

    let stored = items.len();
    let lines: Vec<CartLine> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    let dropped = stored - lines.len();
    if dropped > 0 {
        warn!(dropped, kept = lines.len(), "Skipped undecodable stored cart lines");
    }
    Ok(lines)
}
