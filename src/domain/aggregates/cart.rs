//! Cart Aggregate
//!
//! Lines keep insertion order and are addressed by position, matching the
//! list the front end renders. Each line holds its own copy of the product
//! fields taken when it was first added.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::domain::aggregates::Product;
use crate::domain::events::CartEvent;
use crate::domain::value_objects::{CartTotals, Pricing, ProductId, Quantity};

/// One cart entry. Serialized flat as `{id, name, price, ..., quantity}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    product: Product,
    quantity: Quantity,
}

impl CartLine {
    pub fn new(product: Product, quantity: Quantity) -> Self { Self { product, quantity } }
    pub fn product(&self) -> &Product { &self.product }
    pub fn id(&self) -> ProductId { self.product.id }
    pub fn name(&self) -> &str { &self.product.name }
    pub fn price(&self) -> Decimal { self.product.price }
    pub fn quantity(&self) -> Quantity { self.quantity }
    /// Price times quantity, saturating at `Decimal::MAX`. Lines held by a
    /// [`Cart`] never saturate.
    pub fn line_total(&self) -> Decimal { self.checked_line_total().unwrap_or(Decimal::MAX) }

    pub fn checked_line_total(&self) -> Option<Decimal> { self.product.price.checked_mul(Decimal::from(self.quantity.value())) }
}

fn checked_subtotal(lines: &[CartLine]) -> Option<Decimal> {
    lines.iter().try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.checked_line_total()?))
}

/// Outcome of a successful quantity adjustment.
#[derive(Clone, Debug, PartialEq)]
pub enum Adjustment {
    Updated(Quantity),
    Removed(CartLine),
}

#[derive(Clone, Debug, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
    events: Vec<CartEvent>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    /// Rebuilds a cart from stored lines, rejecting states the cart itself
    /// could never produce.
    pub fn from_lines(lines: Vec<CartLine>) -> Result<Self, CartError> {
        for (i, line) in lines.iter().enumerate() {
            if !line.product.has_valid_price() {
                return Err(CartError::NegativePrice(line.id()));
            }
            if lines[..i].iter().any(|other| other.id() == line.id()) {
                return Err(CartError::DuplicateLine(line.id()));
            }
            if checked_subtotal(&lines[..=i]).is_none() {
                return Err(CartError::TotalOverflow(line.id()));
            }
        }
        Ok(Self { lines, events: vec![] })
    }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn line(&self, index: usize) -> Option<&CartLine> { self.lines.get(index) }
    pub fn len(&self) -> usize { self.lines.len() }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    /// Position of the line for `product_id`, for callers that prefer
    /// addressing lines by product rather than by index.
    pub fn line_index(&self, product_id: ProductId) -> Option<usize> {
        self.lines.iter().position(|l| l.id() == product_id)
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u64 { self.lines.iter().map(|l| u64::from(l.quantity.value())).sum() }

    /// Sum of line totals. Every mutation keeps this representable.
    pub fn subtotal(&self) -> Decimal { checked_subtotal(&self.lines).unwrap_or(Decimal::MAX) }

    pub fn totals(&self, pricing: &Pricing) -> CartTotals { pricing.totals(self.subtotal()) }

    /// Adds one unit of `product_id` as currently listed in `catalog`.
    pub fn add_item(&mut self, product_id: ProductId, catalog: &Catalog) -> Result<&CartLine, CartError> {
        let product = catalog.find(product_id).ok_or(CartError::ProductNotFound(product_id))?;
        self.add_product(product)
    }

    /// Adds one unit of `product`, merging with an existing line for the same
    /// id. The quantity saturates at `u32::MAX`. Refused with
    /// `TotalOverflow` when the subtotal would no longer be representable.
    pub fn add_product(&mut self, product: &Product) -> Result<&CartLine, CartError> {
        let index = match self.line_index(product.id) {
            Some(index) => {
                let previous = self.lines[index].quantity;
                self.lines[index].quantity = previous.increment();
                if checked_subtotal(&self.lines).is_none() {
                    self.lines[index].quantity = previous;
                    return Err(CartError::TotalOverflow(product.id));
                }
                index
            }
            None => {
                self.lines.push(CartLine::new(product.clone(), Quantity::ONE));
                if checked_subtotal(&self.lines).is_none() {
                    self.lines.pop();
                    return Err(CartError::TotalOverflow(product.id));
                }
                self.lines.len() - 1
            }
        };
        let line = &self.lines[index];
        debug!(product_id = %line.id(), quantity = %line.quantity, "cart item added");
        self.events.push(CartEvent::ItemAdded { product_id: line.id(), name: line.name().to_string(), quantity: line.quantity });
        Ok(&self.lines[index])
    }

    /// Applies `delta` to the line at `index`. A result of zero or less
    /// removes the line. A zero delta reports the unchanged quantity without
    /// recording an event. Out-of-range indices, and increases that would
    /// overflow the subtotal, change nothing and return `None`.
    pub fn adjust_quantity(&mut self, index: usize, delta: i64) -> Option<Adjustment> {
        let current = self.lines.get(index)?.quantity;
        if delta == 0 {
            return Some(Adjustment::Updated(current));
        }
        match current.adjust(delta) {
            Some(quantity) => {
                self.lines[index].quantity = quantity;
                if checked_subtotal(&self.lines).is_none() {
                    self.lines[index].quantity = current;
                    warn!(index, delta, "quantity change would overflow the cart total");
                    return None;
                }
                let product_id = self.lines[index].id();
                debug!(%product_id, %quantity, "cart quantity adjusted");
                self.events.push(CartEvent::QuantityAdjusted { product_id, quantity });
                Some(Adjustment::Updated(quantity))
            }
            None => self.remove_item(index).map(Adjustment::Removed),
        }
    }

    /// Removes the line at `index`; out-of-range is a no-op.
    pub fn remove_item(&mut self, index: usize) -> Option<CartLine> {
        if index >= self.lines.len() {
            return None;
        }
        let line = self.lines.remove(index);
        debug!(product_id = %line.id(), "cart item removed");
        self.events.push(CartEvent::ItemRemoved { product_id: line.id(), name: line.name().to_string() });
        Some(line)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.events.push(CartEvent::Cleared);
    }

    pub fn take_events(&mut self) -> Vec<CartEvent> { std::mem::take(&mut self.events) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),
    #[error("duplicate cart line for product {0}")]
    DuplicateLine(ProductId),
    #[error("negative price on cart line for product {0}")]
    NegativePrice(ProductId),
    #[error("cart total overflows at product {0}")]
    TotalOverflow(ProductId),
}
