//! Catalog inspection.

use atelier_core::{CurrencyCode, Price};
use atelier_storefront::db::ProductRepository;

use super::{CliError, connect};

/// Print every active product.
pub async fn list() -> Result<(), CliError> {
    let (_, pool) = connect().await?;
    let products = ProductRepository::new(pool).list_active().await?;

    tracing::info!(count = products.len(), "Loaded catalog");

    #[allow(clippy::print_stdout)]
    {
        for product in &products {
            let price = Price::new(product.price, CurrencyCode::default());
            println!(
                "{:<24} {:<40} {:>10}",
                product.id.as_str(),
                product.name,
                price.display()
            );
        }
    }
    Ok(())
}
