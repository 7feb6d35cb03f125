//! Product repository.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use atelier_core::{Product, ProductId};

use super::RepositoryError;

/// Repository for catalog products.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load every active product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a product has a negative price.
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<(String, String, Decimal, Option<String>)> = sqlx::query_as(
            r"
            SELECT id, name, price, image_url
            FROM storefront.product
            WHERE active
            ORDER BY name
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, name, price, image)| {
                if price.is_sign_negative() {
                    return Err(RepositoryError::DataCorruption(format!(
                        "negative price for product {id}"
                    )));
                }
                Ok(Product {
                    id: ProductId::new(id),
                    name,
                    price,
                    image,
                })
            })
            .collect()
    }
}
