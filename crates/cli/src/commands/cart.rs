//! Signed-in cart inspection and reset.
//!
//! Reads go through the same catalog cache the storefront uses, so the
//! printed summary matches what the shopper sees.

use atelier_core::{CurrencyCode, UserId, populate, summarize};
use atelier_storefront::catalog::CatalogCache;
use atelier_storefront::db::{ProductRepository, ProfileRepository};

use super::{CliError, connect};

/// Print a user's cart lines and summary.
pub async fn show(user: &UserId) -> Result<(), CliError> {
    let (config, pool) = connect().await?;
    let profiles = ProfileRepository::new(pool.clone());
    let catalog = CatalogCache::new(
        ProductRepository::new(pool),
        CurrencyCode::default(),
        config.catalog_ttl,
    );

    let Some(cart) = profiles.get_cart(user).await? else {
        tracing::info!(user_id = %user, "User has no cart");
        return Ok(());
    };
    let snapshot = catalog.snapshot().await?;
    let summary = summarize(&cart, &snapshot);

    #[allow(clippy::print_stdout)]
    {
        for line in populate(&cart, &snapshot) {
            println!(
                "{:<24} {:<10} x{:<4} {:>10}",
                line.name,
                line.size.as_str(),
                line.quantity,
                line.line_total.display()
            );
        }
        println!(
            "{} items, total {}",
            summary.item_count,
            summary.total.display()
        );
        if summary.unresolved_lines > 0 {
            println!(
                "{} lines reference products missing from the catalog",
                summary.unresolved_lines
            );
        }
    }
    Ok(())
}

/// Replace a user's cart with an empty list.
pub async fn clear(user: &UserId) -> Result<(), CliError> {
    let (_, pool) = connect().await?;
    ProfileRepository::new(pool).clear_cart(user).await?;

    tracing::info!(user_id = %user, "Cart cleared");
    Ok(())
}
