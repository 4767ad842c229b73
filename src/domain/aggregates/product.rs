//! Product Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::ProductId;

/// A catalog product as served by the storefront API.
///
/// Only `id`, `name` and `price` are required on the wire; the remaining
/// fields fall back to empty values when the API omits them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub availability: String,
    #[serde(default)]
    pub popularity: f64,
}

impl Product {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(), name: name.into(), price, category: String::new(), brand: String::new(),
            image: None, gallery: vec![], description: String::new(), availability: String::new(), popularity: 0.0,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self { self.category = category.into(); self }
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self { self.brand = brand.into(); self }
    pub fn with_popularity(mut self, popularity: f64) -> Self { self.popularity = popularity; self }

    /// Listing image: the explicit image if any, otherwise the first gallery entry.
    pub fn primary_image(&self) -> Option<&str> {
        self.image.as_deref().or_else(|| self.gallery.first().map(String::as_str))
    }

    pub fn has_valid_price(&self) -> bool { !self.price.is_sign_negative() }

    pub fn in_category(&self, category: &str) -> bool { eq_ignore_case(&self.category, category) }
    pub fn of_brand(&self, brand: &str) -> bool { eq_ignore_case(&self.brand, brand) }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars().flat_map(char::to_lowercase).eq(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_defaults() {
        let p: Product = serde_json::from_str(r#"{"id": 7, "name": "Mouse", "price": 19.99}"#).unwrap();
        assert_eq!(p.id, ProductId::new(7));
        assert_eq!(p.price, Decimal::new(1999, 2));
        assert!(p.gallery.is_empty());
        assert_eq!(p.popularity, 0.0);
        assert!(p.primary_image().is_none());
    }

    #[test]
    fn test_product_full() {
        let p: Product = serde_json::from_str(r#"{
            "id": 1, "name": "Laptop", "price": 1200, "category": "Laptop", "brand": "Acme",
            "gallery": ["a.jpg", "b.jpg"], "description": "Fast", "availability": "In stock", "popularity": 87
        }"#).unwrap();
        assert_eq!(p.price, Decimal::new(1200, 0));
        assert_eq!(p.primary_image(), Some("a.jpg"));
        assert!(p.in_category("LAPTOP"));
        assert!(p.of_brand("acme"));
        assert!(!p.of_brand("other"));
    }

    #[test]
    fn test_negative_price() {
        let p = Product::new(1u64, "Broken", Decimal::new(-1, 0));
        assert!(!p.has_valid_price());
        assert!(Product::new(2u64, "Free", Decimal::ZERO).has_valid_price());
    }
}
