//! Product catalog lookup
//!
//! Small in-memory catalog the shell hands to the orchestrator: product
//! lookup by id, category and keyword filtering, and the context strings the
//! stylist prompt is built from.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub price: u32,
    pub original_price: u32,
    pub image: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Product {
    /// Stylist context describing this product.
    pub fn styling_context(&self) -> String {
        format!(
            "Product: {}. Brand: {}. Category: {}. Description: {}",
            self.name, self.brand, self.category, self.description
        )
    }

    /// Percentage off the original price, rounded down.
    pub fn discount_percent(&self) -> u32 {
        if self.original_price == 0 || self.price >= self.original_price {
            return 0;
        }
        (self.original_price - self.price) * 100 / self.original_price
    }

    fn matches(&self, needle: &str) -> bool {
        [&self.name, &self.brand, &self.category, &self.description]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
    }
}

/// Stylist context used on the home feed.
pub fn browsing_context() -> String {
    "Context: User is browsing the home screen looking for recommendations.".to_string()
}

/// Stylist context for the signed-in user's profile page.
pub fn profile_context(name: &str) -> String {
    format!(
        "User Profile: {}. Style: Streetwear, Relaxed, Gen Z.",
        name
    )
}

pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self> {
        let products: Vec<Product> = serde_json::from_str(json)?;

        let mut ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(Error::Invariant(format!(
                "Duplicate product id in catalog: {}",
                pair[0]
            )));
        }

        Ok(Self { products })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// The mock catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn find(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn by_category(&self, category: &str) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| p.category.eq_ignore_ascii_case(category))
            .collect()
    }

    /// Case-insensitive keyword search over names, brands, categories,
    /// descriptions and tags. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let needle = query.trim().to_lowercase();
        self.products
            .iter()
            .filter(|p| needle.is_empty() || p.matches(&needle))
            .collect()
    }

    /// Distinct categories in catalog order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for product in &self.products {
            if !seen.contains(&product.category.as_str()) {
                seen.push(&product.category);
            }
        }
        seen
    }
}
