//! Shopping bag line items

use crate::catalog::Product;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SIZE: &str = "M";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagItem {
    pub product: Product,
    pub quantity: u32,
    pub size: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bag {
    items: Vec<BagItem>,
}

impl Bag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[BagItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one unit; an existing line for the same product is incremented.
    pub fn add(&mut self, product: &Product) {
        match self.items.iter_mut().find(|i| i.product.id == product.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(1),
            None => self.items.push(BagItem {
                product: product.clone(),
                quantity: 1,
                size: DEFAULT_SIZE.to_string(),
            }),
        }
    }

    /// Set a line's quantity. Zero or negative removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove(product_id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product_id) {
            item.quantity = quantity;
        }
    }

    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|i| i.product.id != product_id);
    }

    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    pub fn subtotal(&self) -> u64 {
        self.items
            .iter()
            .map(|i| u64::from(i.product.price) * u64::from(i.quantity))
            .fold(0, u64::saturating_add)
    }

    /// Total saved against original prices.
    pub fn savings(&self) -> u64 {
        self.items
            .iter()
            .map(|i| {
                u64::from(i.product.original_price.saturating_sub(i.product.price))
                    * u64::from(i.quantity)
            })
            .fold(0, u64::saturating_add)
    }
}
