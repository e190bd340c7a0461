use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::{
    client::storage::KeyValueStore,
    models::{CartItem, Product},
    money::round2,
};

pub const CART_STORAGE_KEY: &str = "amino_cart_v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cart store is not available")]
pub struct CartUnavailable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartNotice {
    Added { name: String },
    QuantityUpdated { name: String },
    Removed,
    Cleared,
}

impl fmt::Display for CartNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartNotice::Added { name } => write!(f, "{name} added to cart."),
            CartNotice::QuantityUpdated { name } => write!(f, "{name} quantity updated in cart."),
            CartNotice::Removed => f.write_str("Item removed from cart."),
            CartNotice::Cleared => f.write_str("Cart cleared."),
        }
    }
}

pub struct CartStore {
    items: Vec<CartItem>,
    storage: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Rehydrate from storage. Unreadable or corrupt snapshots yield an empty cart.
    pub fn open(storage: Arc<dyn KeyValueStore>) -> Self {
        let items = match storage.get(CART_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
                Ok(lines) => normalize(parse_lines(lines)),
                Err(err) => {
                    tracing::warn!(error = %err, "discarding corrupt cart snapshot");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "cart storage unreadable; starting empty");
                Vec::new()
            }
        };
        Self { items, storage }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Merge by id: an existing line only gains quantity, its name and price stay.
    pub fn add(&mut self, product: &Product, quantity: u32) -> CartNotice {
        let quantity = quantity.max(1);
        let notice = match self.items.iter_mut().find(|item| item.id == product.id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(quantity);
                tracing::debug!(id = %product.id, quantity = existing.quantity, "cart quantity updated");
                CartNotice::QuantityUpdated {
                    name: product.name.clone(),
                }
            }
            None => {
                let mut item = CartItem::from_product(product);
                item.quantity = quantity;
                tracing::debug!(id = %product.id, quantity, "cart item added");
                self.items.push(item);
                CartNotice::Added {
                    name: product.name.clone(),
                }
            }
        };
        self.persist();
        notice
    }

    /// Idempotent.
    pub fn remove(&mut self, id: &str) -> CartNotice {
        self.items.retain(|item| item.id != id);
        tracing::debug!(%id, remaining = self.items.len(), "cart item removed");
        self.persist();
        CartNotice::Removed
    }

    /// Set an exact quantity; zero or below removes the line.
    pub fn set_quantity(&mut self, id: &str, quantity: i64) -> Option<CartNotice> {
        if quantity <= 0 {
            return Some(self.remove(id));
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            item.quantity = quantity;
            tracing::debug!(%id, quantity, "cart quantity set");
            self.persist();
        }
        None
    }

    pub fn clear(&mut self) -> CartNotice {
        self.items.clear();
        tracing::debug!("cart cleared");
        self.persist();
        CartNotice::Cleared
    }

    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    pub fn total_price(&self) -> f64 {
        round2(self.items.iter().map(CartItem::line_total).sum())
    }

    /// The in-memory cart stays authoritative if the write fails.
    fn persist(&self) {
        let snapshot = match serde_json::to_string(&self.items) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize cart");
                return;
            }
        };
        if let Err(err) = self.storage.set(CART_STORAGE_KEY, &snapshot) {
            tracing::warn!(error = %err, "failed to persist cart");
        }
    }
}

// One bad line is dropped on its own; the rest of the cart survives.
fn parse_lines(lines: Vec<serde_json::Value>) -> Vec<CartItem> {
    lines
        .into_iter()
        .filter_map(|line| match serde_json::from_value::<CartItem>(line) {
            Ok(item) => Some(item),
            Err(err) => {
                tracing::warn!(error = %err, "discarding corrupt cart line");
                None
            }
        })
        .collect()
}

/// Drop empty lines and merge duplicate ids from a hand-edited snapshot.
fn normalize(items: Vec<CartItem>) -> Vec<CartItem> {
    let mut merged: Vec<CartItem> = Vec::with_capacity(items.len());
    for item in items.into_iter().filter(|item| item.quantity > 0) {
        match merged.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => merged.push(item),
        }
    }
    merged
}

pub fn cart_totals(cart: Option<&CartStore>) -> Result<(u64, f64), CartUnavailable> {
    let cart = cart.ok_or(CartUnavailable)?;
    Ok((cart.total_items(), cart.total_price()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{catalog::Catalog, client::storage::MemoryStore};

    fn store() -> (Arc<MemoryStore>, CartStore) {
        let storage = Arc::new(MemoryStore::new());
        let cart = CartStore::open(storage.clone());
        (storage, cart)
    }

    fn product(id: &str) -> &'static Product {
        Catalog.find(id).unwrap()
    }

    #[test]
    fn repeated_adds_merge_quantities() {
        let (_, mut cart) = store();
        let p = product("peptide-001");
        assert_eq!(cart.add(p, 2), CartNotice::Added { name: p.name.clone() });
        assert_eq!(
            cart.add(p, 3),
            CartNotice::QuantityUpdated { name: p.name.clone() }
        );
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[test]
    fn set_quantity_is_exact_and_non_positive_removes() {
        let (_, mut cart) = store();
        cart.add(product("peptide-001"), 4);
        cart.add(product("peptide-002"), 1);

        assert_eq!(cart.set_quantity("peptide-001", 2), None);
        assert_eq!(cart.items()[0].quantity, 2);

        assert_eq!(cart.set_quantity("peptide-001", 0), Some(CartNotice::Removed));
        assert_eq!(cart.set_quantity("peptide-002", -1), Some(CartNotice::Removed));
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_missing_is_a_no_op() {
        let (_, mut cart) = store();
        cart.add(product("peptide-003"), 1);
        assert_eq!(cart.remove("does-not-exist"), CartNotice::Removed);
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn snapshot_survives_reopen() {
        let (storage, mut cart) = store();
        cart.add(product("peptide-001"), 2);
        cart.add(product("peptide-004"), 1);

        let reopened = CartStore::open(storage);
        let mut before = cart.items().to_vec();
        let mut after = reopened.items().to_vec();
        before.sort_by(|a, b| a.id.cmp(&b.id));
        after.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(before, after);
    }

    #[test]
    fn corrupt_snapshot_starts_empty() {
        for raw in ["not json", r#"[{"id":"x","name":"x","quantity":-1}]"#, "{}"] {
            let storage = Arc::new(MemoryStore::new());
            storage.set(CART_STORAGE_KEY, raw).unwrap();
            assert!(CartStore::open(storage).is_empty(), "{raw}");
        }
    }

    #[test]
    fn snapshot_is_normalized() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set(
                CART_STORAGE_KEY,
                r#"[{"id":"a","name":"A","price":1.5,"quantity":1},
                    {"id":"b","name":"B","quantity":0},
                    {"id":"a","name":"A","price":1.5,"quantity":2}]"#,
            )
            .unwrap();
        let cart = CartStore::open(storage);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_price(), 4.5);
    }

    #[test]
    fn null_price_counts_as_zero_and_keeps_other_lines() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set(
                CART_STORAGE_KEY,
                r#"[{"id":"a","price":null,"quantity":2},
                    {"id":"b","price":3,"quantity":1},
                    {"id":"c","name":"C","quantity":-4}]"#,
            )
            .unwrap();
        let cart = CartStore::open(storage);
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_price(), 3.0);
    }

    #[test]
    fn non_finite_price_survives_reopen() {
        let (storage, mut cart) = store();
        let mut odd = product("peptide-001").clone();
        odd.price = f64::NAN;
        cart.add(&odd, 2);
        cart.add(product("peptide-002"), 1);

        let reopened = CartStore::open(storage);
        assert_eq!(reopened.total_items(), 3);
        assert_eq!(reopened.total_price(), product("peptide-002").price);
    }

    #[test]
    fn missing_price_counts_as_zero() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set(CART_STORAGE_KEY, r#"[{"id":"a","name":"A","quantity":3}]"#)
            .unwrap();
        let cart = CartStore::open(storage);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_price(), 0.0);
    }

    #[test]
    fn absent_store_is_reported() {
        assert_eq!(cart_totals(None), Err(CartUnavailable));
        let (_, cart) = store();
        assert_eq!(cart_totals(Some(&cart)), Ok((0, 0.0)));
    }

    #[test]
    fn totals_match_entries_for_random_sequences() {
        let ids = ["peptide-001", "peptide-002", "peptide-005", "peptide-008"];
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..50 {
            let (_, mut cart) = store();
            let mut model: HashMap<&str, i64> = HashMap::new();

            for _ in 0..40 {
                let id = ids[rng.random_range(0..ids.len())];
                match rng.random_range(0..10) {
                    0..=4 => {
                        let qty = rng.random_range(1..5u32);
                        cart.add(product(id), qty);
                        *model.entry(id).or_default() += i64::from(qty);
                    }
                    5 | 6 => {
                        cart.remove(id);
                        model.remove(id);
                    }
                    7 | 8 => {
                        let qty = rng.random_range(-2..6i64);
                        cart.set_quantity(id, qty);
                        if qty <= 0 {
                            model.remove(id);
                        } else if let Some(q) = model.get_mut(id) {
                            *q = qty;
                        }
                    }
                    _ => {
                        cart.clear();
                        model.clear();
                    }
                }

                let expected_items: i64 = model.values().sum();
                let expected_price: f64 = model
                    .iter()
                    .map(|(id, qty)| product(id).price * *qty as f64)
                    .sum();
                assert_eq!(cart.total_items() as i64, expected_items);
                assert_eq!(cart.total_price(), round2(expected_price));
                assert_eq!(cart.items().len(), model.len());
                assert!(cart.items().iter().all(|item| item.quantity >= 1));
            }
        }
    }
}
