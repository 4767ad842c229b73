//! Catalog cache
//!
//! The product list is fetched once per session and never mutated afterwards.
//! Filtering and sorting produce borrowed views, so consecutive queries always
//! start from the full list.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiError, StorefrontApi};
use crate::domain::aggregates::Product;
use crate::domain::value_objects::ProductId;

/// Sentinel filter value matching any category or brand.
pub const ALL: &str = "all";

/// Category, brand and price-ceiling filter as offered by the listing page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: String,
    pub brand: String,
    /// Inclusive ceiling; `None` means no ceiling.
    pub max_price: Option<Decimal>,
}

impl ProductFilter {
    pub fn all() -> Self { Self { category: ALL.to_string(), brand: ALL.to_string(), max_price: None } }
    pub fn category(mut self, category: impl Into<String>) -> Self { self.category = category.into(); self }
    pub fn brand(mut self, brand: impl Into<String>) -> Self { self.brand = brand.into(); self }
    pub fn max_price(mut self, max_price: Decimal) -> Self { self.max_price = Some(max_price); self }

    pub fn matches(&self, product: &Product) -> bool {
        let category = is_all(&self.category) || product.in_category(&self.category);
        let brand = is_all(&self.brand) || product.of_brand(&self.brand);
        let price = self.max_price.map_or(true, |max| product.price <= max);
        category && brand && price
    }
}

impl Default for ProductFilter {
    fn default() -> Self { Self::all() }
}

fn is_all(value: &str) -> bool { value.trim().is_empty() || value.trim().eq_ignore_ascii_case(ALL) }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    PriceAscending,
    PriceDescending,
    PopularityDescending,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriceAscending => "price-low-high",
            Self::PriceDescending => "price-high-low",
            Self::PopularityDescending => "popularity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort order `{0}` (expected price-low-high, price-high-low or popularity)")]
pub struct UnknownSortOrder(String);

impl FromStr for SortOrder {
    type Err = UnknownSortOrder;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price-low-high" => Ok(Self::PriceAscending),
            "price-high-low" => Ok(Self::PriceDescending),
            "popularity" => Ok(Self::PopularityDescending),
            _ => Err(UnknownSortOrder(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Builds a catalog, dropping products with a negative price.
    pub fn new(products: Vec<Product>) -> Self {
        let products = products
            .into_iter()
            .filter(|p| {
                let valid = p.has_valid_price();
                if !valid {
                    warn!(product_id = %p.id, price = %p.price, "dropping product with negative price");
                }
                valid
            })
            .collect();
        Self { products }
    }

    /// Fetches the product list once from the remote API.
    pub async fn load<A: StorefrontApi>(api: &A) -> Result<Self, ApiError> {
        let catalog = Self::new(api.fetch_products().await?);
        info!(products = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn products(&self) -> &[Product] { &self.products }
    pub fn len(&self) -> usize { self.products.len() }
    pub fn is_empty(&self) -> bool { self.products.is_empty() }

    pub fn find(&self, id: ProductId) -> Option<&Product> { self.products.iter().find(|p| p.id == id) }

    pub fn filter<P>(&self, mut predicate: P) -> Vec<&Product>
    where
        P: FnMut(&Product) -> bool,
    {
        self.products.iter().filter(|&p| predicate(p)).collect()
    }

    pub fn by_category_brand_price_ceiling(&self, category: &str, brand: &str, max_price: Option<Decimal>) -> Vec<&Product> {
        let filter = ProductFilter { category: category.to_string(), brand: brand.to_string(), max_price };
        self.matching(&filter)
    }

    pub fn matching(&self, filter: &ProductFilter) -> Vec<&Product> { self.filter(|p| filter.matches(p)) }

    pub fn sorted_by(&self, order: SortOrder) -> Vec<&Product> {
        let mut view: Vec<&Product> = self.products.iter().collect();
        sort_view(&mut view, order);
        view
    }

    /// Filtered and optionally sorted view in one pass.
    pub fn view(&self, filter: &ProductFilter, order: Option<SortOrder>) -> Vec<&Product> {
        let mut view = self.matching(filter);
        if let Some(order) = order {
            sort_view(&mut view, order);
        }
        view
    }

    /// Distinct lowercased categories in first-seen order.
    pub fn categories(&self) -> Vec<String> { distinct(self.products.iter().map(|p| p.category.as_str())) }

    /// Distinct lowercased brands in first-seen order.
    pub fn brands(&self) -> Vec<String> { distinct(self.products.iter().map(|p| p.brand.as_str())) }

    /// Highest price in the catalog, the natural ceiling for a price slider.
    pub fn max_price(&self) -> Option<Decimal> { self.products.iter().map(|p| p.price).max() }
}

fn sort_view(view: &mut [&Product], order: SortOrder) {
    match order {
        SortOrder::PriceAscending => view.sort_by(|a, b| a.price.cmp(&b.price)),
        SortOrder::PriceDescending => view.sort_by(|a, b| b.price.cmp(&a.price)),
        SortOrder::PopularityDescending => view.sort_by(|a, b| b.popularity.total_cmp(&a.popularity)),
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = vec![];
    for value in values.filter(|v| !v.trim().is_empty()) {
        let value = value.to_lowercase();
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}
