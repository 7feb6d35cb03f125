//! Integration tests for Atelier.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p atelier-integration-tests
//! ```
//!
//! No database is needed: carts are held in the in-memory stores, and
//! identity and catalog changes are fed through watch channels.
//!
//! # Test Categories
//!
//! - `cart_properties` - Line bookkeeping, merge arithmetic, populated view
//! - `cart_session` - Sign-in merge, sign-out, ordering and failure handling

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use atelier_core::{CartLine, CatalogSnapshot, CurrencyCode, Product, ProductId, UserId};
use atelier_storefront::cart::{MemoryLocalStore, MemoryRemoteStore};
use atelier_storefront::config::CartConfig;
use atelier_storefront::error::CartError;
use atelier_storefront::models::Identity;
use atelier_storefront::{CartManager, MergeReport};
use rust_decimal::Decimal;
use tokio::sync::watch;

/// Key the anonymous cart is stored under.
pub const CART_KEY: &str = "atelier.cart";

/// Manager type used throughout the tests.
pub type TestManager = CartManager<MemoryLocalStore, MemoryRemoteStore>;

/// A manager wired to in-memory stores and a replaceable catalog.
pub struct TestContext {
    pub manager: TestManager,
    pub local: MemoryLocalStore,
    pub remote: MemoryRemoteStore,
    pub catalog: watch::Sender<Arc<CatalogSnapshot>>,
}

impl TestContext {
    /// Start with empty stores and the default catalog.
    pub async fn new() -> Self {
        Self::with_stores(MemoryLocalStore::new(), MemoryRemoteStore::new()).await
    }

    /// Start over pre-seeded stores and the default catalog.
    pub async fn with_stores(local: MemoryLocalStore, remote: MemoryRemoteStore) -> Self {
        let catalog = watch::Sender::new(Arc::new(catalog(&["p1", "p2", "p3"])));
        let manager =
            CartManager::start(&config(), local.clone(), remote.clone(), catalog.subscribe())
                .await;

        Self {
            manager,
            local,
            remote,
            catalog,
        }
    }

    /// Sign `user` in and wait for the merge.
    ///
    /// # Errors
    ///
    /// Returns the manager's error if the merge was abandoned.
    pub async fn sign_in(&self, user: &str) -> Result<Option<MergeReport>, CartError> {
        self.manager
            .apply_identity(&Identity::SignedIn(UserId::new(user)))
            .await
    }

    /// Sign out.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Closed` if the write queue is gone.
    pub async fn sign_out(&self) -> Result<Option<MergeReport>, CartError> {
        self.manager.apply_identity(&Identity::SignedOut).await
    }

    /// Replace the catalog with one holding only `ids`.
    pub fn publish_catalog(&self, ids: &[&str]) {
        self.catalog.send_replace(Arc::new(catalog(ids)));
    }

    /// Current anonymous cart entry.
    #[must_use]
    pub fn local_lines(&self) -> Option<Vec<CartLine>> {
        self.local.get(CART_KEY)
    }

    /// Current remote cart of `user`.
    #[must_use]
    pub fn remote_lines(&self, user: &str) -> Option<Vec<CartLine>> {
        self.remote.get(&UserId::new(user))
    }
}

/// Cart config with short retry delays.
#[must_use]
pub fn config() -> CartConfig {
    CartConfig {
        retry_delay: Duration::from_millis(1),
        ..CartConfig::default()
    }
}

/// Products priced at 10.00 each.
#[must_use]
pub fn products(ids: &[&str]) -> Vec<Product> {
    ids.iter()
        .map(|id| Product {
            id: ProductId::new(*id),
            name: format!("Product {id}"),
            price: Decimal::new(1000, 2),
            image: None,
        })
        .collect()
}

/// A USD catalog of [`products`].
#[must_use]
pub fn catalog(ids: &[&str]) -> CatalogSnapshot {
    CatalogSnapshot::new(CurrencyCode::USD, products(ids))
}

/// Shorthand for a cart line.
#[must_use]
pub fn line(product: &str, size: &str, quantity: u32) -> CartLine {
    CartLine::new(product, size, quantity)
}
