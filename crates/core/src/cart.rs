//! Shopping cart state and its transition function.
//!
//! A cart is an ordered list of [`CartLine`]s plus a derived total. Every
//! change goes through [`reduce`], a pure function from the current
//! [`CartState`] and a [`CartAction`] to the next state. The total is
//! recomputed from the lines on every transition and never adjusted in place.
//!
//! Invariants maintained by every constructor and by [`reduce`]:
//! - at most one line per product id
//! - every line has `quantity > 0`
//! - `total == Σ line.price × line.quantity`

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{Price, ProductId};

/// One product entry in a cart.
///
/// Display fields are copied from the product when it is first added, so
/// later catalog edits do not change what the shopper already sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image_url: String,
    pub category: String,
    pub quantity: u32,
}

impl CartLine {
    /// Snapshot a product's display fields into a new line.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            category: product.category.clone(),
            quantity,
        }
    }

    /// `price × quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Read-only cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CartState {
    lines: Vec<CartLine>,
    total: Price,
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a cart from arbitrary lines, restoring the invariants.
    ///
    /// Lines with quantity zero are dropped and duplicate product ids are
    /// merged into the first occurrence (quantities summed), so a snapshot
    /// coming back from storage can never violate the one-line-per-product
    /// rule.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut merged: Vec<CartLine> = Vec::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match merged.iter_mut().find(|l| l.product_id == line.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => merged.push(line),
            }
        }
        Self::with_lines(merged)
    }

    fn with_lines(lines: Vec<CartLine>) -> Self {
        let total = compute_total(&lines);
        Self { lines, total }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Sum of `price × quantity` over all lines.
    #[must_use]
    pub const fn total(&self) -> Price {
        self.total
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Returns `true` if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line for `product_id`, if present.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    /// Consume the snapshot and return its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }
}

/// An intent that changes the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit of a product.
    Add(Product),
    /// Drop the line for a product (no-op when absent).
    Remove(ProductId),
    /// Set a line's quantity; zero or negative removes the line.
    SetQuantity {
        product_id: ProductId,
        quantity: i64,
    },
    /// Empty the cart.
    Clear,
    /// Replace every line with a snapshot from storage.
    Load(Vec<CartLine>),
}

impl CartAction {
    /// Whether the resulting state should be written back to storage.
    ///
    /// `Load` originates from storage and is never echoed back.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        !matches!(self, Self::Load(_))
    }

    /// Short name for logs and breadcrumbs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
            Self::SetQuantity { .. } => "set_quantity",
            Self::Clear => "clear",
            Self::Load(_) => "load",
        }
    }
}

/// Apply `action` to `state`, producing the next state.
#[must_use]
pub fn reduce(state: &CartState, action: CartAction) -> CartState {
    match action {
        CartAction::Add(product) => {
            let mut lines = state.lines.clone();
            match lines.iter_mut().find(|l| l.product_id == product.id) {
                Some(line) => line.quantity = line.quantity.saturating_add(1),
                None => lines.push(CartLine::from_product(&product, 1)),
            }
            CartState::with_lines(lines)
        }
        CartAction::Remove(product_id) => remove_line(state, &product_id),
        CartAction::SetQuantity {
            product_id,
            quantity,
        } => {
            let quantity = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);
            if quantity == 0 {
                return remove_line(state, &product_id);
            }
            let lines = state
                .lines
                .iter()
                .map(|line| {
                    if line.product_id == product_id {
                        CartLine {
                            quantity,
                            ..line.clone()
                        }
                    } else {
                        line.clone()
                    }
                })
                .collect();
            CartState::with_lines(lines)
        }
        CartAction::Clear => CartState::empty(),
        CartAction::Load(lines) => CartState::from_lines(lines),
    }
}

fn remove_line(state: &CartState, product_id: &ProductId) -> CartState {
    let lines = state
        .lines
        .iter()
        .filter(|l| &l.product_id != product_id)
        .cloned()
        .collect();
    CartState::with_lines(lines)
}

fn compute_total(lines: &[CartLine]) -> Price {
    lines.iter().map(CartLine::line_total).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn product(id: &str, cents: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Coffee {id}"),
            price: Price::from_cents(cents),
            image_url: format!("/images/{id}.jpg"),
            description: String::new(),
            category: "Flavored".to_owned(),
            stock_quantity: None,
            is_active: None,
        }
    }

    fn apply(actions: impl IntoIterator<Item = CartAction>) -> CartState {
        actions
            .into_iter()
            .fold(CartState::empty(), |state, action| reduce(&state, action))
    }

    fn recomputed_total(state: &CartState) -> Price {
        state
            .lines()
            .iter()
            .map(|l| l.price.times(l.quantity))
            .sum()
    }

    #[test]
    fn test_adding_same_product_twice_merges() {
        let a = product("A", 1000);
        let state = apply([CartAction::Add(a.clone()), CartAction::Add(a)]);
        assert_eq!(state.lines().len(), 1);
        assert_eq!(state.lines()[0].quantity, 2);
        assert_eq!(state.total(), Price::from_cents(2000));
    }

    #[test]
    fn test_set_quantity_recomputes_total() {
        let state = apply([
            CartAction::Add(product("A", 1000)),
            CartAction::Add(product("B", 500)),
            CartAction::SetQuantity {
                product_id: ProductId::new("A"),
                quantity: 3,
            },
        ]);
        assert_eq!(state.total(), Price::from_cents(3500));
        assert_eq!(state.item_count(), 4);
    }

    #[test]
    fn test_set_quantity_zero_equals_remove() {
        let base = apply([
            CartAction::Add(product("A", 1000)),
            CartAction::Add(product("B", 500)),
        ]);
        let zeroed = reduce(
            &base,
            CartAction::SetQuantity {
                product_id: ProductId::new("A"),
                quantity: 0,
            },
        );
        let negative = reduce(
            &base,
            CartAction::SetQuantity {
                product_id: ProductId::new("A"),
                quantity: -4,
            },
        );
        let removed = reduce(&base, CartAction::Remove(ProductId::new("A")));
        assert_eq!(zeroed, removed);
        assert_eq!(negative, removed);
        assert!(removed.line(&ProductId::new("A")).is_none());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let base = apply([CartAction::Add(product("A", 1000))]);
        assert_eq!(reduce(&base, CartAction::Remove(ProductId::new("Z"))), base);
    }

    #[test]
    fn test_set_quantity_on_absent_line_is_noop() {
        let base = apply([CartAction::Add(product("A", 1000))]);
        let next = reduce(
            &base,
            CartAction::SetQuantity {
                product_id: ProductId::new("Z"),
                quantity: 5,
            },
        );
        assert_eq!(next, base);
    }

    #[test]
    fn test_clear_empties_everything() {
        let state = apply([
            CartAction::Add(product("A", 1000)),
            CartAction::Add(product("B", 500)),
            CartAction::Clear,
        ]);
        assert!(state.is_empty());
        assert_eq!(state.total(), Price::ZERO);
    }

    #[test]
    fn test_load_replaces_prior_lines() {
        let base = apply([CartAction::Add(product("A", 1000))]);
        let snapshot = vec![CartLine::from_product(&product("B", 500), 2)];
        let loaded = reduce(&base, CartAction::Load(snapshot));
        assert!(loaded.line(&ProductId::new("A")).is_none());
        assert_eq!(loaded.total(), Price::from_cents(1000));
    }

    #[test]
    fn test_load_restores_invariants() {
        let b = product("B", 500);
        let snapshot = vec![
            CartLine::from_product(&b, 1),
            CartLine::from_product(&product("C", 700), 0),
            CartLine::from_product(&b, 2),
        ];
        let loaded = reduce(&CartState::empty(), CartAction::Load(snapshot));
        assert_eq!(loaded.lines().len(), 1);
        assert_eq!(loaded.lines()[0].quantity, 3);
    }

    #[test]
    fn test_load_with_extreme_values_saturates() {
        let mut line = CartLine::from_product(&product("A", 1000), u32::MAX);
        line.price = Price::new(rust_decimal::Decimal::MAX).unwrap();
        let other = CartLine::from_product(&product("B", 500), u32::MAX);
        let loaded = reduce(&CartState::empty(), CartAction::Load(vec![line, other]));
        assert_eq!(loaded.total().amount(), rust_decimal::Decimal::MAX);
        assert_eq!(loaded.item_count(), u32::MAX);
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let state = apply([
            CartAction::Add(product("B", 500)),
            CartAction::Add(product("A", 1000)),
            CartAction::Add(product("B", 500)),
        ]);
        let ids: Vec<&str> = state.lines().iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[test]
    fn test_only_load_skips_persistence() {
        assert!(!CartAction::Load(Vec::new()).is_persisted());
        assert!(CartAction::Clear.is_persisted());
        assert!(CartAction::Remove(ProductId::new("A")).is_persisted());
    }

    fn arb_action() -> impl Strategy<Value = CartAction> {
        let ids = prop::sample::select(vec!["A", "B", "C", "D"]);
        let cents = prop::sample::select(vec![0_u32, 1, 599, 1000, 2499]);
        prop_oneof![
            4 => (ids.clone(), cents.clone()).prop_map(|(id, c)| CartAction::Add(product(id, c))),
            2 => ids.clone().prop_map(|id| CartAction::Remove(ProductId::new(id))),
            3 => (ids.clone(), -3_i64..20).prop_map(|(id, q)| CartAction::SetQuantity {
                product_id: ProductId::new(id),
                quantity: q,
            }),
            1 => Just(CartAction::Clear),
            1 => prop::collection::vec((ids, cents, 0_u32..5), 0..6).prop_map(|raw| {
                CartAction::Load(
                    raw.into_iter()
                        .map(|(id, c, q)| CartLine::from_product(&product(id, c), q))
                        .collect(),
                )
            }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Total always equals the sum recomputed from the lines.
        #[test]
        fn prop_total_matches_lines(actions in prop::collection::vec(arb_action(), 0..40)) {
            let mut state = CartState::empty();
            for action in actions {
                state = reduce(&state, action);
                prop_assert_eq!(state.total(), recomputed_total(&state));
                prop_assert!(state.lines().iter().all(|l| l.quantity > 0));
                let mut ids: Vec<&ProductId> = state.lines().iter().map(|l| &l.product_id).collect();
                ids.sort();
                ids.dedup();
                prop_assert_eq!(ids.len(), state.lines().len());
            }
        }

        /// N adds of one product give quantity N and total price × N.
        #[test]
        fn prop_repeated_add_accumulates(count in 1_u32..50, cents in 0_u32..10_000) {
            let p = product("A", cents);
            let state = apply((0..count).map(|_| CartAction::Add(p.clone())));
            prop_assert_eq!(state.lines().len(), 1);
            prop_assert_eq!(state.lines()[0].quantity, count);
            prop_assert_eq!(state.total(), Price::from_cents(cents).times(count));
        }
    }
}
