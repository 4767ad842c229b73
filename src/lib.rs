//! OpenSASE Storefront
//!
//! UI-agnostic core of a small storefront front end.
//!
//! ## Features
//! - Product catalog cache with filtering and sorting
//! - Shopping cart persisted to durable key-value storage
//! - Cart totals with flat shipping and tax
//! - Checkout submission to the storefront backend
//!
//! Front ends own a [`Storefront`] session, call its operations in response
//! to user actions and re-render from the snapshot handed to their refresh
//! callback.

pub mod api;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod query;
pub mod session;
pub mod storage;

use thiserror::Error;

pub use api::{ApiError, HttpApi, StorefrontApi};
pub use catalog::{Catalog, ProductFilter, SortOrder};
pub use config::{ConfigError, StorefrontConfig};
pub use domain::aggregates::{Cart, CartError, CartLine, OrderConfirmation, OrderError, OrderRequest, Product};
pub use domain::events::{CartEvent, DomainEvent, OrderEvent};
pub use domain::value_objects::{CartTotals, Pricing, ProductId, Quantity};
pub use session::{CartView, RefreshCause, Storefront};
pub use storage::{CartStore, FileStore, KeyValueStore, MemoryStore, StorageError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("{0}")]
    UserError(String),

    #[error("failed to load products: {0}")]
    FetchFailed(#[source] ApiError),

    #[error("order submission failed: {0}")]
    SubmissionFailed(#[source] ApiError),
}

impl From<CartError> for StorefrontError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ProductNotFound(id) => Self::NotFound(id),
            other => Self::UserError(other.to_string()),
        }
    }
}

impl From<OrderError> for StorefrontError {
    fn from(e: OrderError) -> Self { Self::UserError(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
