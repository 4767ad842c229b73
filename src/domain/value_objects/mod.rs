//! Value Objects for the storefront core

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use thiserror::Error;

/// Catalog identity of a product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    pub const fn new(value: u64) -> Self { Self(value) }
    pub const fn value(self) -> u64 { self.0 }
}

impl From<u64> for ProductId {
    fn from(value: u64) -> Self { Self(value) }
}

impl FromStr for ProductId {
    type Err = ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { s.trim().parse().map(Self) }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Quantity of a cart line. Zero is not representable: a line that would
/// drop to zero is removed instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Self = Self(1);

    pub fn new(value: u32) -> Option<Self> { (value > 0).then_some(Self(value)) }
    pub fn value(self) -> u32 { self.0 }
    pub fn increment(self) -> Self { Self(self.0.saturating_add(1)) }

    /// Applies a signed delta. `None` means the result is zero or negative.
    pub fn adjust(self, delta: i64) -> Option<Self> {
        let next = i64::from(self.0).saturating_add(delta);
        if next <= 0 {
            return None;
        }
        Some(Self(u32::try_from(next).unwrap_or(u32::MAX)))
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value).ok_or(QuantityError::Zero) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity must be at least 1")]
    Zero,
}

/// Flat shipping fee and tax rate applied to a cart subtotal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pricing {
    shipping_flat: Decimal,
    tax_rate: Decimal,
}

impl Pricing {
    pub const fn new(shipping_flat: Decimal, tax_rate: Decimal) -> Self { Self { shipping_flat, tax_rate } }
    pub fn shipping_flat(&self) -> Decimal { self.shipping_flat }
    pub fn tax_rate(&self) -> Decimal { self.tax_rate }

    /// Derives shipping, tax and grand total from a subtotal. Shipping is
    /// only charged on a non-zero subtotal. Tax and total saturate at
    /// `Decimal::MAX` instead of overflowing.
    pub fn totals(&self, subtotal: Decimal) -> CartTotals {
        let shipping = if subtotal > Decimal::ZERO { self.shipping_flat } else { Decimal::ZERO };
        let tax = subtotal.checked_mul(self.tax_rate).unwrap_or(Decimal::MAX);
        let total = subtotal.checked_add(shipping).and_then(|t| t.checked_add(tax)).unwrap_or(Decimal::MAX);
        CartTotals { subtotal, shipping, tax, total }
    }
}

impl Default for Pricing {
    fn default() -> Self { Self::new(Decimal::new(10, 0), Decimal::new(13, 2)) }
}

/// Totals derived from cart state. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

/// Formats an amount the way the storefront displays prices, e.g. `$5.20`.
pub fn format_amount(amount: Decimal) -> String { format!("${:.2}", amount.round_dp(2)) }
