//! Integration tests for cart line bookkeeping and the populated view.
//!
//! These run in the anonymous phase; every mutation is awaited so the
//! stored cart can be checked too.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use atelier_core::{CurrencyCode, ProductId, Size};
use atelier_integration_tests::{CART_KEY, TestContext, config, line, products};
use atelier_storefront::CartManager;
use atelier_storefront::cart::{MemoryLocalStore, MemoryRemoteStore};
use atelier_storefront::catalog::{CatalogCache, StaticCatalog};
use rust_decimal::Decimal;

async fn add(ctx: &TestContext, product: &str, quantity: i64, size: &str) {
    ctx.manager
        .add_line(ProductId::new(product), quantity, Size::new(size))
        .await
        .outcome()
        .await
        .unwrap();
}

async fn set(ctx: &TestContext, product: &str, size: &str, quantity: i64) {
    ctx.manager
        .set_quantity(&ProductId::new(product), &Size::new(size), quantity)
        .await
        .outcome()
        .await
        .unwrap();
}

// =============================================================================
// Line Bookkeeping
// =============================================================================

#[tokio::test]
async fn test_one_line_per_product_and_size() {
    let ctx = TestContext::new().await;

    for (product, size) in [
        ("p1", "M"),
        ("p1", "L"),
        ("p1", "M"),
        ("p2", ""),
        ("p2", "  "),
        ("p1", "L"),
    ] {
        add(&ctx, product, 1, size).await;
    }

    let cart = ctx.manager.cart();
    let mut keys: Vec<_> = cart
        .lines()
        .iter()
        .map(|l| (l.product_id.clone(), l.size.clone()))
        .collect();
    let total = keys.len();
    keys.sort_by(|a, b| (a.0.as_str(), a.1.as_str()).cmp(&(b.0.as_str(), b.1.as_str())));
    keys.dedup();

    assert_eq!(keys.len(), total);
    assert_eq!(
        cart.lines(),
        &[line("p1", "M", 2), line("p1", "L", 2), line("p2", "", 2)]
    );
}

#[tokio::test]
async fn test_adds_sum_into_one_line() {
    let ctx = TestContext::new().await;

    add(&ctx, "p1", 2, "M").await;
    add(&ctx, "p1", 3, "M").await;

    assert_eq!(ctx.manager.cart().lines(), &[line("p1", "M", 5)]);
    assert_eq!(ctx.local_lines(), Some(vec![line("p1", "M", 5)]));
}

#[tokio::test]
async fn test_zero_and_negative_quantity_remove_like_remove_line() {
    let seeded = || {
        let local = MemoryLocalStore::new();
        local.insert(CART_KEY, vec![line("p1", "M", 2), line("p2", "L", 1)]);
        local
    };

    let zero = TestContext::with_stores(seeded(), MemoryRemoteStore::new()).await;
    set(&zero, "p1", "M", 0).await;

    let negative = TestContext::with_stores(seeded(), MemoryRemoteStore::new()).await;
    set(&negative, "p1", "M", -1).await;

    let removed = TestContext::with_stores(seeded(), MemoryRemoteStore::new()).await;
    removed
        .manager
        .remove_line(&ProductId::new("p1"), &Size::new("M"))
        .await
        .outcome()
        .await
        .unwrap();

    let expected = vec![line("p2", "L", 1)];
    for ctx in [&zero, &negative, &removed] {
        assert_eq!(ctx.manager.cart().lines(), expected.as_slice());
        assert_eq!(ctx.local_lines(), Some(expected.clone()));
    }
}

#[tokio::test]
async fn test_set_quantity_overwrites() {
    let ctx = TestContext::new().await;

    add(&ctx, "p1", 2, "M").await;
    set(&ctx, "p1", "M", 7).await;

    assert_eq!(ctx.manager.cart().lines(), &[line("p1", "M", 7)]);
    assert_eq!(ctx.manager.summary().item_count, 7);
}

#[tokio::test]
async fn test_clear_persists_empty_list() {
    let ctx = TestContext::new().await;

    add(&ctx, "p1", 2, "M").await;
    ctx.manager.clear().await.outcome().await.unwrap();

    assert!(ctx.manager.cart().is_empty());
    assert_eq!(ctx.local_lines(), Some(vec![]));
}

// =============================================================================
// Populated View
// =============================================================================

#[tokio::test]
async fn test_summary_counts_quantities() {
    let ctx = TestContext::new().await;

    add(&ctx, "p1", 2, "M").await;
    add(&ctx, "p2", 1, "L").await;

    let summary = ctx.manager.summary();
    assert_eq!(summary.item_count, 3);
    assert_eq!(summary.total.amount, Decimal::new(3000, 2));
    assert_eq!(summary.total.display(), "$30.00");
}

#[tokio::test]
async fn test_dangling_line_excluded_then_restored() {
    let ctx = TestContext::new().await;
    add(&ctx, "p1", 1, "M").await;
    add(&ctx, "p3", 1, "M").await;

    ctx.publish_catalog(&["p1", "p2"]);

    let summary = ctx.manager.summary();
    assert_eq!(summary.item_count, 1);
    assert_eq!(summary.total.amount, Decimal::new(1000, 2));
    assert_eq!(summary.unresolved_lines, 1);
    assert_eq!(ctx.manager.populated().len(), 1);
    assert_eq!(
        ctx.local_lines(),
        Some(vec![line("p1", "M", 1), line("p3", "M", 1)])
    );

    let mut catalog = ctx.manager.subscribe_catalog();
    ctx.publish_catalog(&["p1", "p2", "p3"]);
    assert!(catalog.has_changed().unwrap());

    let populated = ctx.manager.populated();
    assert_eq!(populated.len(), 2);
    assert_eq!(
        populated.last().unwrap().product_id,
        ProductId::new("p3")
    );
    assert_eq!(ctx.manager.summary().item_count, 2);
}

#[tokio::test]
async fn test_populated_view_follows_catalog_cache() {
    let cache = CatalogCache::new(
        StaticCatalog::new(products(&["p1"])),
        CurrencyCode::USD,
        Duration::from_secs(60),
    );
    let local = MemoryLocalStore::new();
    local.insert(CART_KEY, vec![line("p1", "M", 2)]);
    let manager = CartManager::start(
        &config(),
        local,
        MemoryRemoteStore::new(),
        cache.subscribe(),
    )
    .await;

    // Nothing loaded yet, so nothing resolves
    assert!(manager.populated().is_empty());
    assert_eq!(manager.summary().unresolved_lines, 1);

    cache.snapshot().await.unwrap();

    let populated = manager.populated();
    assert_eq!(populated.len(), 1);
    assert_eq!(populated.first().unwrap().name, "Product p1");
    assert_eq!(manager.summary().total.display(), "$20.00");
}
