//! Cart lines and the pure cart operations.
//!
//! Every mutation the cart manager performs is decided here, on plain data,
//! before anything is persisted. A [`Cart`] never holds two lines with the
//! same `(product_id, size)` key and never holds a line with quantity zero.

use serde::{Deserialize, Deserializer, Serialize};

use super::id::ProductId;
use super::size::Size;

/// One distinct purchasable combination in a cart.
///
/// Serialised in camelCase, which is the stored shape of a cart list in
/// both the local and the remote backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Catalog entry this line refers to. May dangle if the product is removed.
    pub product_id: ProductId,
    /// Size variant, or the default sentinel.
    #[serde(default)]
    pub size: Size,
    /// Number of units, always at least 1 inside a [`Cart`].
    pub quantity: u32,
}

impl CartLine {
    /// Create a new cart line.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, size: impl Into<Size>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            size: size.into(),
            quantity,
        }
    }

    /// Returns true if this line has the given key.
    #[must_use]
    pub fn matches(&self, product_id: &ProductId, size: &Size) -> bool {
        self.product_id == *product_id && self.size == *size
    }
}

/// What a cart operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineChange {
    /// A new line was appended.
    Inserted(CartLine),
    /// An existing line changed quantity.
    Updated {
        /// Line after the change.
        line: CartLine,
        /// Quantity before the change.
        previous: u32,
    },
    /// A line was removed.
    Removed(CartLine),
    /// The whole cart was emptied.
    Cleared {
        /// Number of lines that were removed.
        lines: usize,
    },
    /// Nothing changed.
    Unchanged,
}

impl LineChange {
    /// Returns true if the cart was modified.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// An ordered collection of [`CartLine`]s with unique `(product_id, size)` keys.
///
/// Order carries no meaning for correctness but is kept stable for display:
/// new lines are appended, updated lines keep their position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from stored lines, restoring the cart invariants.
    ///
    /// Lines with quantity zero are dropped and repeated keys are coalesced
    /// into the first occurrence by summing quantities.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity > 0 {
                cart.fold_line(line);
            }
        }
        cart
    }

    /// The lines in display order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consume the cart and return its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// Returns true if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Look up the line for a key.
    #[must_use]
    pub fn line(&self, product_id: &ProductId, size: &Size) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.matches(product_id, size))
    }

    fn position(&self, product_id: &ProductId, size: &Size) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.matches(product_id, size))
    }

    fn line_mut(&mut self, product_id: &ProductId, size: &Size) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.matches(product_id, size))
    }

    /// Add `quantity` units of a product/size.
    ///
    /// Sums into an existing line with the same key, otherwise appends.
    /// A quantity of zero or less is ignored.
    pub fn add(&mut self, product_id: ProductId, size: Size, quantity: i64) -> LineChange {
        let Some(quantity) = positive_quantity(quantity) else {
            return LineChange::Unchanged;
        };

        if let Some(line) = self.line_mut(&product_id, &size) {
            let previous = line.quantity;
            line.quantity = previous.saturating_add(quantity);
            return LineChange::Updated {
                line: line.clone(),
                previous,
            };
        }

        let line = CartLine {
            product_id,
            size,
            quantity,
        };
        self.lines.push(line.clone());
        LineChange::Inserted(line)
    }

    /// Remove the line for a key. Absent keys are not an error.
    pub fn remove(&mut self, product_id: &ProductId, size: &Size) -> LineChange {
        self.position(product_id, size)
            .map_or(LineChange::Unchanged, |index| {
                LineChange::Removed(self.lines.remove(index))
            })
    }

    /// Overwrite the quantity of an existing line.
    ///
    /// Zero or negative quantities remove the line. A positive quantity for
    /// a key that is not in the cart changes nothing.
    pub fn set_quantity(
        &mut self,
        product_id: &ProductId,
        size: &Size,
        quantity: i64,
    ) -> LineChange {
        let Some(quantity) = positive_quantity(quantity) else {
            return self.remove(product_id, size);
        };

        let Some(line) = self.line_mut(product_id, size) else {
            return LineChange::Unchanged;
        };
        let previous = line.quantity;
        if previous == quantity {
            return LineChange::Unchanged;
        }
        line.quantity = quantity;
        LineChange::Updated {
            line: line.clone(),
            previous,
        }
    }

    /// Empty the cart.
    pub fn clear(&mut self) -> LineChange {
        let lines = self.lines.len();
        self.lines.clear();
        if lines == 0 {
            LineChange::Unchanged
        } else {
            LineChange::Cleared { lines }
        }
    }

    /// Fold every line of `other` into this cart.
    ///
    /// Matching keys have their quantities summed; new keys are appended in
    /// `other`'s order.
    pub fn merge_from(&mut self, other: &Self) {
        for line in &other.lines {
            self.fold_line(line.clone());
        }
    }

    /// The sign-in merge: `remote` with every line of `local` folded in.
    #[must_use]
    pub fn merged(remote: &Self, local: &Self) -> Self {
        let mut result = remote.clone();
        result.merge_from(local);
        result
    }

    fn fold_line(&mut self, line: CartLine) {
        match self.line_mut(&line.product_id, &line.size) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => self.lines.push(line),
        }
    }
}

impl FromIterator<CartLine> for Cart {
    fn from_iter<I: IntoIterator<Item = CartLine>>(iter: I) -> Self {
        Self::from_lines(iter)
    }
}

// Stored lists are untrusted; deserialising goes through `from_lines`.
impl<'de> Deserialize<'de> for Cart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let lines = Vec::<CartLine>::deserialize(deserializer)?;
        Ok(Self::from_lines(lines))
    }
}

fn positive_quantity(quantity: i64) -> Option<u32> {
    if quantity <= 0 {
        return None;
    }
    Some(u32::try_from(quantity).unwrap_or(u32::MAX))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pid(id: &str) -> ProductId {
        ProductId::new(id)
    }

    fn size(s: &str) -> Size {
        Size::new(s)
    }

    #[test]
    fn test_add_sums_matching_key() {
        let mut cart = Cart::new();
        cart.add(pid("p"), size("M"), 2);
        let change = cart.add(pid("p"), size("M"), 3);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.line(&pid("p"), &size("M")).unwrap().quantity, 5);
        assert!(matches!(change, LineChange::Updated { previous: 2, .. }));
    }

    #[test]
    fn test_add_distinct_sizes_are_distinct_lines() {
        let mut cart = Cart::new();
        cart.add(pid("p"), size("M"), 1);
        cart.add(pid("p"), size("L"), 1);
        cart.add(pid("p"), Size::default(), 1);

        assert_eq!(cart.len(), 3);
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_add_non_positive_is_ignored() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(pid("p"), size("M"), 0), LineChange::Unchanged);
        assert_eq!(cart.add(pid("p"), size("M"), -4), LineChange::Unchanged);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_saturates() {
        let mut cart = Cart::new();
        cart.add(pid("p"), size("M"), i64::MAX);
        cart.add(pid("p"), size("M"), 10);
        assert_eq!(cart.line(&pid("p"), &size("M")).unwrap().quantity, u32::MAX);
    }

    #[test]
    fn test_uniqueness_over_many_adds() {
        let mut cart = Cart::new();
        for i in 0..50_i64 {
            let product = format!("p{}", i % 4);
            let s = if i % 3 == 0 { "M" } else { "L" };
            cart.add(pid(&product), size(s), i % 5);
        }

        let mut keys: Vec<_> = cart
            .lines()
            .iter()
            .map(|l| (l.product_id.clone(), l.size.clone()))
            .collect();
        let before = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), before);
        assert!(cart.lines().iter().all(|l| l.quantity >= 1));
    }

    #[test]
    fn test_set_quantity_zero_and_negative_remove() {
        for quantity in [0, -1] {
            let mut via_set = Cart::new();
            via_set.add(pid("p"), size("M"), 3);
            via_set.add(pid("q"), size("M"), 1);
            let mut via_remove = via_set.clone();

            let change = via_set.set_quantity(&pid("p"), &size("M"), quantity);
            via_remove.remove(&pid("p"), &size("M"));

            assert!(matches!(change, LineChange::Removed(_)));
            assert_eq!(via_set, via_remove);
        }
    }

    #[test]
    fn test_set_quantity_overwrites() {
        let mut cart = Cart::new();
        cart.add(pid("p"), size("M"), 3);
        let change = cart.set_quantity(&pid("p"), &size("M"), 7);

        assert!(matches!(change, LineChange::Updated { previous: 3, .. }));
        assert_eq!(cart.line(&pid("p"), &size("M")).unwrap().quantity, 7);
    }

    #[test]
    fn test_set_quantity_on_absent_line_changes_nothing() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.set_quantity(&pid("p"), &size("M"), 2),
            LineChange::Unchanged
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_absent_is_unchanged() {
        let mut cart = Cart::new();
        cart.add(pid("p"), size("M"), 1);
        assert_eq!(cart.remove(&pid("p"), &size("L")), LineChange::Unchanged);
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        assert_eq!(cart.clear(), LineChange::Unchanged);
        cart.add(pid("p"), size("M"), 1);
        cart.add(pid("q"), size("M"), 1);
        assert_eq!(cart.clear(), LineChange::Cleared { lines: 2 });
        assert!(cart.is_empty());
    }

    #[test]
    fn test_merge_sums_matching_keys() {
        let local = Cart::from_lines([CartLine::new("P1", "M", 1)]);
        let remote = Cart::from_lines([CartLine::new("P1", "M", 2)]);

        let merged = Cart::merged(&remote, &local);
        assert_eq!(merged.lines(), &[CartLine::new("P1", "M", 3)]);
    }

    #[test]
    fn test_merge_disjoint_appends_local_after_remote() {
        let local = Cart::from_lines([CartLine::new("P2", "L", 1)]);
        let remote = Cart::from_lines([CartLine::new("P1", "M", 2)]);

        let merged = Cart::merged(&remote, &local);
        assert_eq!(
            merged.lines(),
            &[CartLine::new("P1", "M", 2), CartLine::new("P2", "L", 1)]
        );
    }

    #[test]
    fn test_merge_with_empty_local_is_identity() {
        let remote = Cart::from_lines([CartLine::new("P1", "M", 3)]);
        assert_eq!(Cart::merged(&remote, &Cart::new()), remote);
    }

    #[test]
    fn test_from_lines_restores_invariants() {
        let cart = Cart::from_lines([
            CartLine::new("a", "M", 1),
            CartLine::new("b", "M", 0),
            CartLine::new("a", "M", 2),
            CartLine::new("c", "", 1),
            CartLine::new("c", "default", 1),
        ]);

        assert_eq!(
            cart.lines(),
            &[CartLine::new("a", "M", 3), CartLine::new("c", "default", 2)]
        );
    }

    #[test]
    fn test_stored_shape_is_camel_case_list() {
        let cart = Cart::from_lines([CartLine::new("P1", "M", 2)]);
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "productId": "P1", "size": "M", "quantity": 2 }])
        );
    }

    #[test]
    fn test_deserialize_normalises_stored_list() {
        let json = r#"[
            {"productId": "P1", "quantity": 1},
            {"productId": "P1", "size": "default", "quantity": 4},
            {"productId": "P2", "size": "S", "quantity": 0}
        ]"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.lines(), &[CartLine::new("P1", "default", 5)]);
    }
}
