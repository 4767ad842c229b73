//! Domain events
use crate::domain::value_objects::{ProductId, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Cart(CartEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CartEvent {
    ItemAdded { product_id: ProductId, name: String, quantity: Quantity },
    QuantityAdjusted { product_id: ProductId, quantity: Quantity },
    ItemRemoved { product_id: ProductId, name: String },
    Cleared,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Placed { reference: Uuid, total: Decimal, placed_at: DateTime<Utc> },
}

impl From<CartEvent> for DomainEvent {
    fn from(e: CartEvent) -> Self { Self::Cart(e) }
}

impl From<OrderEvent> for DomainEvent {
    fn from(e: OrderEvent) -> Self { Self::Order(e) }
}
