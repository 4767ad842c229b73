//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::Product;
pub use order::{OrderConfirmation, OrderError, OrderRequest};
pub use cart::{Adjustment, Cart, CartError, CartLine};
