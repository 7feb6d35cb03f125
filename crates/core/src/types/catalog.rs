//! Read-only catalog snapshot used to populate carts.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::{CurrencyCode, Price};

/// A catalog product as seen by the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price in the catalog currency.
    pub price: Decimal,
    /// Primary image URL.
    pub image: Option<String>,
}

/// All products known at one point in time, keyed by ID.
///
/// Snapshots are immutable; a catalog refresh produces a new snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    currency: CurrencyCode,
    products: HashMap<ProductId, Product>,
}

impl CatalogSnapshot {
    /// Build a snapshot from a list of products. Later duplicates win.
    #[must_use]
    pub fn new(currency: CurrencyCode, products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            currency,
            products: products
                .into_iter()
                .map(|product| (product.id.clone(), product))
                .collect(),
        }
    }

    /// An empty snapshot in the default currency.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a product.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(id)
    }

    /// Unit price of a product in the catalog currency.
    #[must_use]
    pub fn price_of(&self, id: &ProductId) -> Option<Price> {
        self.get(id)
            .map(|product| Price::new(product.price, self.currency))
    }

    /// Currency every price in this snapshot is expressed in.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns true if the snapshot has no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: id.to_string(),
            price: Decimal::new(cents, 2),
            image: None,
        }
    }

    #[test]
    fn test_price_of_uses_snapshot_currency() {
        let catalog = CatalogSnapshot::new(CurrencyCode::GBP, [product("scarf", 3450)]);

        let price = catalog.price_of(&ProductId::new("scarf")).unwrap();
        assert_eq!(price, Price::new(Decimal::new(3450, 2), CurrencyCode::GBP));
        assert_eq!(catalog.price_of(&ProductId::new("missing")), None);
    }

    #[test]
    fn test_later_duplicates_win() {
        let catalog =
            CatalogSnapshot::new(CurrencyCode::USD, [product("tee", 1000), product("tee", 1200)]);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(&ProductId::new("tee")).unwrap().price, Decimal::new(1200, 2));
        assert!(CatalogSnapshot::empty().is_empty());
    }
}
