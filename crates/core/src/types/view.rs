//! Populated cart view and summary.
//!
//! Both are derived on every read from a [`Cart`] and a [`CatalogSnapshot`]
//! and never stored. Lines whose product is missing from the snapshot are
//! left out of the view and contribute nothing to totals, but stay in the
//! cart, so they reappear once the product is back in the catalog.

use serde::Serialize;

use super::cart::Cart;
use super::catalog::CatalogSnapshot;
use super::id::ProductId;
use super::price::Price;
use super::size::Size;

/// A cart line joined with its live catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulatedCartLine {
    pub product_id: ProductId,
    pub size: Size,
    pub quantity: u32,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: Price,
    pub line_total: Price,
}

/// Cart totals for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    /// Sum of quantities over resolvable lines (not distinct lines).
    pub item_count: u64,
    /// Sum of `quantity * unit price` over resolvable lines.
    pub total: Price,
    /// Lines skipped because their product is not in the catalog.
    pub unresolved_lines: usize,
}

/// Join a cart with a catalog snapshot, keeping cart order.
#[must_use]
pub fn populate(cart: &Cart, catalog: &CatalogSnapshot) -> Vec<PopulatedCartLine> {
    cart.lines()
        .iter()
        .filter_map(|line| {
            let product = catalog.get(&line.product_id)?;
            let unit_price = catalog.price_of(&line.product_id)?;
            Some(PopulatedCartLine {
                product_id: line.product_id.clone(),
                size: line.size.clone(),
                quantity: line.quantity,
                name: product.name.clone(),
                image: product.image.clone(),
                unit_price,
                line_total: unit_price.times(line.quantity),
            })
        })
        .collect()
}

/// Compute item count and total price over the populated view.
#[must_use]
pub fn summarize(cart: &Cart, catalog: &CatalogSnapshot) -> CartSummary {
    let populated = populate(cart, catalog);
    let item_count = populated.iter().map(|line| u64::from(line.quantity)).sum();
    let amount = populated.iter().map(|line| line.line_total.amount).sum();

    CartSummary {
        item_count,
        total: Price::new(amount, catalog.currency()),
        unresolved_lines: cart.len() - populated.len(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::{CartLine, CurrencyCode, Product};

    fn product(id: &str, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::new(cents, 2),
            image: Some(format!("https://cdn.example/{id}.jpg")),
        }
    }

    #[test]
    fn test_populate_keeps_cart_order() {
        let catalog =
            CatalogSnapshot::new(CurrencyCode::USD, [product("a", 1000), product("b", 250)]);
        let cart = Cart::from_lines([CartLine::new("b", "M", 2), CartLine::new("a", "S", 1)]);

        let view = populate(&cart, &catalog);
        assert_eq!(view.len(), 2);
        let first = view.first().unwrap();
        assert_eq!(first.product_id.as_str(), "b");
        assert_eq!(first.line_total.amount, Decimal::new(500, 2));
        assert_eq!(view.get(1).unwrap().name, "Product a");
    }

    #[test]
    fn test_summary_counts_quantities_and_totals() {
        let catalog =
            CatalogSnapshot::new(CurrencyCode::EUR, [product("a", 1000), product("b", 250)]);
        let cart = Cart::from_lines([CartLine::new("a", "M", 2), CartLine::new("b", "M", 3)]);

        let summary = summarize(&cart, &catalog);
        assert_eq!(summary.item_count, 5);
        assert_eq!(summary.total, Price::new(Decimal::new(2750, 2), CurrencyCode::EUR));
        assert_eq!(summary.unresolved_lines, 0);
    }

    #[test]
    fn test_dangling_line_is_skipped_not_removed() {
        let cart = Cart::from_lines([CartLine::new("a", "M", 1), CartLine::new("P3", "M", 1)]);
        let without = CatalogSnapshot::new(CurrencyCode::USD, [product("a", 1000)]);

        let summary = summarize(&cart, &without);
        assert_eq!(summary.item_count, 1);
        assert_eq!(summary.total.amount, Decimal::new(1000, 2));
        assert_eq!(summary.unresolved_lines, 1);
        assert_eq!(cart.len(), 2);

        let restored =
            CatalogSnapshot::new(CurrencyCode::USD, [product("a", 1000), product("P3", 500)]);
        let view = populate(&cart, &restored);
        assert_eq!(view.len(), 2);
        assert_eq!(summarize(&cart, &restored).item_count, 2);
    }

    #[test]
    fn test_empty_cart_summary() {
        let summary = summarize(&Cart::new(), &CatalogSnapshot::empty());
        assert_eq!(summary.item_count, 0);
        assert_eq!(summary.total, Price::zero(CurrencyCode::USD));
    }
}
