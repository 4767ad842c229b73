//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Cart, CartLine};
use crate::domain::value_objects::Pricing;

/// Body of the order submission: `{email, items, total}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct OrderRequest {
    #[validate(email)]
    pub email: String,
    pub items: Vec<CartLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl OrderRequest {
    /// Snapshots `cart` into an order for `email`. The total is the grand
    /// total including shipping and tax, not the bare subtotal, so the backend
    /// receives the amount the customer was shown.
    pub fn from_cart(email: &str, cart: &Cart, pricing: &Pricing) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        let order = Self { email: email.trim().to_string(), items: cart.lines().to_vec(), total: cart.totals(pricing).total };
        if order.validate().is_err() {
            return Err(OrderError::InvalidEmail(order.email));
        }
        Ok(order)
    }

    pub fn item_count(&self) -> u64 { self.items.iter().map(|l| u64::from(l.quantity().value())).sum() }
}

/// Returned to the caller once the API accepted the order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderConfirmation {
    pub reference: Uuid,
    pub email: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub item_count: u64,
    pub placed_at: DateTime<Utc>,
}

impl OrderConfirmation {
    pub fn new(reference: Uuid, order: &OrderRequest) -> Self {
        Self { reference, email: order.email.clone(), total: order.total, item_count: order.item_count(), placed_at: Utc::now() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("invalid contact address: {0:?}")]
    InvalidEmail(String),
}
