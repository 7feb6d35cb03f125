//! Cached catalog snapshots.
//!
//! Carts are populated against an immutable [`CatalogSnapshot`]. Snapshots
//! are loaded from a [`CatalogSource`], cached with `moka` (TTL from config)
//! and published on a `watch` channel so cart views are recomputed whenever
//! a new snapshot arrives.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument};

use atelier_core::{CatalogSnapshot, CurrencyCode, Product};

use crate::db::ProductRepository;

/// Errors loading the catalog.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("catalog load failed: {0}")]
    Load(String),
}

/// Where catalog products come from.
pub trait CatalogSource: Send + Sync + 'static {
    /// Load every product currently for sale.
    fn load(&self) -> impl Future<Output = Result<Vec<Product>, CatalogError>> + Send;
}

impl CatalogSource for ProductRepository {
    async fn load(&self) -> Result<Vec<Product>, CatalogError> {
        self.list_active()
            .await
            .map_err(|e| CatalogError::Load(e.to_string()))
    }
}

/// A fixed list of products, for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    /// Create a source that always returns `products`.
    #[must_use]
    pub const fn new(products: Vec<Product>) -> Self {
        Self { products }
    }
}

impl CatalogSource for StaticCatalog {
    async fn load(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.clone())
    }
}

/// Catalog snapshots cached in front of a [`CatalogSource`].
///
/// Cheaply cloneable; clones share the cache and the publisher.
pub struct CatalogCache<S> {
    inner: Arc<CatalogCacheInner<S>>,
}

impl<S> Clone for CatalogCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CatalogCacheInner<S> {
    source: S,
    currency: CurrencyCode,
    cache: Cache<(), Arc<CatalogSnapshot>>,
    publisher: watch::Sender<Arc<CatalogSnapshot>>,
}

impl<S: CatalogSource> CatalogCache<S> {
    /// Create a cache. The published snapshot starts empty until the first load.
    #[must_use]
    pub fn new(source: S, currency: CurrencyCode, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        let (publisher, _) = watch::channel(Arc::new(CatalogSnapshot::new(currency, [])));

        Self {
            inner: Arc::new(CatalogCacheInner {
                source,
                currency,
                cache,
                publisher,
            }),
        }
    }

    /// Get the current snapshot, loading it if the cached one expired.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the source fails to load.
    #[instrument(skip(self))]
    pub async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .cache
            .try_get_with((), async move {
                let products = inner.source.load().await?;
                let snapshot = Arc::new(CatalogSnapshot::new(inner.currency, products));
                debug!(products = snapshot.len(), "Catalog snapshot loaded");
                inner.publisher.send_replace(Arc::clone(&snapshot));
                Ok::<_, CatalogError>(snapshot)
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Drop the cached snapshot and load a fresh one.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the source fails to load.
    pub async fn refresh(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        self.inner.cache.invalidate(&()).await;
        self.snapshot().await
    }

    /// Subscribe to published snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<CatalogSnapshot>> {
        self.inner.publisher.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use atelier_core::ProductId;
    use rust_decimal::Decimal;

    use super::*;

    struct CountingSource {
        loads: Arc<AtomicUsize>,
    }

    impl CatalogSource for CountingSource {
        async fn load(&self) -> Result<Vec<Product>, CatalogError> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Product {
                id: ProductId::new(format!("p{n}")),
                name: "Linen shirt".to_string(),
                price: Decimal::new(4500, 2),
                image: None,
            }])
        }
    }

    struct FailingSource;

    impl CatalogSource for FailingSource {
        async fn load(&self) -> Result<Vec<Product>, CatalogError> {
            Err(CatalogError::Load("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_snapshot_is_cached() {
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = CatalogCache::new(
            CountingSource {
                loads: Arc::clone(&loads),
            },
            CurrencyCode::USD,
            Duration::from_secs(60),
        );

        let first = cache.snapshot().await.unwrap();
        let second = cache.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_reloads_and_publishes() {
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = CatalogCache::new(
            CountingSource {
                loads: Arc::clone(&loads),
            },
            CurrencyCode::USD,
            Duration::from_secs(60),
        );
        let rx = cache.subscribe();
        assert!(rx.borrow().is_empty());

        cache.snapshot().await.unwrap();
        let refreshed = cache.refresh().await.unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert!(refreshed.get(&ProductId::new("p1")).is_some());
        assert!(rx.borrow().get(&ProductId::new("p1")).is_some());
    }

    #[tokio::test]
    async fn test_load_failure_is_reported() {
        let cache = CatalogCache::new(FailingSource, CurrencyCode::USD, Duration::from_secs(60));
        let err = cache.snapshot().await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_static_catalog() {
        let cache = CatalogCache::new(
            StaticCatalog::new(vec![Product {
                id: ProductId::new("tee"),
                name: "Tee".to_string(),
                price: Decimal::new(1500, 2),
                image: None,
            }]),
            CurrencyCode::EUR,
            Duration::from_secs(60),
        );

        let snapshot = cache.snapshot().await.unwrap();
        assert_eq!(snapshot.currency(), CurrencyCode::EUR);
        assert_eq!(snapshot.len(), 1);
    }
}
