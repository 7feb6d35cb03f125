//! User profile repository.
//!
//! The remote cart lives in the `cart` JSONB column of `storefront.user_profile`.
//! Writes upsert that single column so the rest of the profile is untouched.

use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use atelier_core::{Cart, CartLine, UserId};

use super::RepositoryError;
use crate::cart::RemoteCartStore;
use crate::cart::store::decode_lines;
use crate::error::StoreError;

/// Repository for the cart field of user profiles.
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the stored cart of a user.
    ///
    /// Returns `None` when the profile does not exist or has no cart yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored cart is not a list of lines.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn get_cart(&self, user: &UserId) -> Result<Option<Cart>, RepositoryError> {
        let row: Option<(Option<serde_json::Value>,)> =
            sqlx::query_as("SELECT cart FROM storefront.user_profile WHERE uid = $1")
                .bind(user.as_str())
                .fetch_optional(&self.pool)
                .await?;

        let Some((Some(value),)) = row else {
            return Ok(None);
        };

        let lines = decode_lines(value).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid cart for user {user}: {e}"))
        })?;
        Ok(Some(Cart::from_lines(lines)))
    }

    /// Replace the cart field of a user's profile, creating the profile if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, lines), fields(user_id = %user, lines = lines.len()))]
    pub async fn set_cart(&self, user: &UserId, lines: &[CartLine]) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.user_profile (uid, cart)
            VALUES ($1, $2)
            ON CONFLICT (uid) DO UPDATE
            SET cart = EXCLUDED.cart,
                updated_at = now()
            ",
        )
        .bind(user.as_str())
        .bind(Json(lines))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove the cart field of a user's profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn clear_cart(&self, user: &UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.user_profile
            SET cart = '[]'::jsonb,
                updated_at = now()
            WHERE uid = $1
            ",
        )
        .bind(user.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

impl RemoteCartStore for ProfileRepository {
    async fn read_cart(&self, user: &UserId) -> Result<Option<Vec<CartLine>>, StoreError> {
        Ok(self.get_cart(user).await?.map(Cart::into_lines))
    }

    async fn write_cart(&self, user: &UserId, lines: &[CartLine]) -> Result<(), StoreError> {
        Ok(self.set_cart(user, lines).await?)
    }
}
