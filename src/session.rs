//! Storefront session
//!
//! One `Storefront` is created when a front end starts and dropped when it
//! shuts down. Every cart mutation follows the same order: update the
//! in-memory cart, write it to storage, then invoke the refresh callback, so
//! a refresh always sees what storage holds. A successful catalog load also
//! invokes the callback.

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::StorefrontApi;
use crate::catalog::{Catalog, ProductFilter, SortOrder};
use crate::domain::aggregates::{Cart, CartLine, OrderConfirmation, OrderRequest, Product};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{CartTotals, Pricing, ProductId};
use crate::storage::{CartStore, KeyValueStore};
use crate::{Result, StorefrontError};

/// What changed before a refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshCause {
    Cart,
    Catalog,
}

/// Immutable snapshot of the cart and the catalog cache handed to the
/// refresh callback.
#[derive(Clone, Copy, Debug)]
pub struct CartView<'a> {
    pub cause: RefreshCause,
    pub lines: &'a [CartLine],
    pub totals: CartTotals,
    pub item_count: u64,
    pub catalog: &'a Catalog,
}

type RefreshFn = Box<dyn FnMut(CartView<'_>)>;

pub struct Storefront<A, S> {
    api: A,
    cart_store: CartStore<S>,
    pricing: Pricing,
    catalog: Catalog,
    cart: Cart,
    events: Vec<DomainEvent>,
    on_refresh: Option<RefreshFn>,
}

impl<A: StorefrontApi, S: KeyValueStore> Storefront<A, S> {
    /// Creates a session with the cart restored from storage and an empty catalog.
    pub fn new(api: A, cart_store: CartStore<S>, pricing: Pricing) -> Self {
        let cart = cart_store.load();
        Self { api, cart_store, pricing, catalog: Catalog::default(), cart, events: vec![], on_refresh: None }
    }

    /// Registers the presentation callback invoked after every cart change
    /// and every successful catalog load.
    pub fn on_refresh(&mut self, f: impl FnMut(CartView<'_>) + 'static) { self.on_refresh = Some(Box::new(f)); }

    pub fn api(&self) -> &A { &self.api }
    pub fn catalog(&self) -> &Catalog { &self.catalog }
    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn pricing(&self) -> &Pricing { &self.pricing }
    pub fn totals(&self) -> CartTotals { self.cart.totals(&self.pricing) }

    pub fn view(&self) -> CartView<'_> {
        CartView {
            cause: RefreshCause::Cart,
            lines: self.cart.lines(),
            totals: self.totals(),
            item_count: self.cart.item_count(),
            catalog: &self.catalog,
        }
    }

    /// Startup sequence: fetch the catalog, then re-read the stored cart. A
    /// failed fetch is returned after the cart has still been restored.
    pub async fn start(&mut self) -> Result<usize> {
        let loaded = self.load_catalog().await;
        self.reload_cart();
        loaded
    }

    /// Fetches the catalog. On failure the current catalog is kept as is
    /// (empty on first load).
    pub async fn load_catalog(&mut self) -> Result<usize> {
        let catalog = Catalog::load(&self.api).await.map_err(|e| {
            warn!(error = %e, "catalog fetch failed");
            StorefrontError::FetchFailed(e)
        })?;
        self.catalog = catalog;
        self.refresh(RefreshCause::Catalog);
        Ok(self.catalog.len())
    }

    pub fn products(&self, filter: &ProductFilter, sort: Option<SortOrder>) -> Vec<&Product> { self.catalog.view(filter, sort) }

    pub fn product_detail(&self, id: ProductId) -> Result<&Product> { self.catalog.find(id).ok_or(StorefrontError::NotFound(id)) }

    /// Re-reads the cart from storage, discarding the in-memory copy.
    pub fn reload_cart(&mut self) {
        self.cart = self.cart_store.load();
        self.refresh(RefreshCause::Cart);
    }

    pub fn add_item(&mut self, product_id: ProductId) -> Result<()> {
        self.cart.add_item(product_id, &self.catalog)?;
        self.commit();
        Ok(())
    }

    /// Returns `false` for a stale index or a refused overflow. A zero delta
    /// on a valid index still persists and refreshes.
    pub fn adjust_quantity(&mut self, index: usize, delta: i64) -> bool {
        let changed = self.cart.adjust_quantity(index, delta).is_some();
        if changed {
            self.commit();
        }
        changed
    }

    /// Returns `false` for an out-of-range index.
    pub fn remove_item(&mut self, index: usize) -> bool {
        let changed = self.cart.remove_item(index).is_some();
        if changed {
            self.commit();
        }
        changed
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
        self.commit();
    }

    /// Submits the cart as an order for `email`. The cart is only cleared once
    /// the backend accepted the order; any failure leaves it untouched.
    pub async fn checkout(&mut self, email: &str) -> Result<OrderConfirmation> {
        let order = OrderRequest::from_cart(email, &self.cart, &self.pricing)?;
        let reference = Uuid::new_v4();
        self.api.submit_order(&order, reference).await.map_err(|e| {
            warn!(%reference, error = %e, "order submission failed");
            StorefrontError::SubmissionFailed(e)
        })?;

        let confirmation = OrderConfirmation::new(reference, &order);
        info!(%reference, total = %confirmation.total, items = confirmation.item_count, "order placed");
        self.cart.clear();
        if let Err(error) = self.cart_store.clear() {
            error!(%error, "failed to clear persisted cart after checkout");
        }
        self.drain_cart_events();
        self.events.push(DomainEvent::Order(OrderEvent::Placed {
            reference,
            total: confirmation.total,
            placed_at: confirmation.placed_at,
        }));
        self.refresh(RefreshCause::Cart);
        Ok(confirmation)
    }

    /// Events recorded since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        self.drain_cart_events();
        std::mem::take(&mut self.events)
    }

    fn drain_cart_events(&mut self) { self.events.extend(self.cart.take_events().into_iter().map(DomainEvent::Cart)); }

    fn commit(&mut self) {
        self.drain_cart_events();
        if let Err(error) = self.cart_store.save(&self.cart) {
            error!(%error, key = self.cart_store.key(), "failed to persist cart");
        }
        self.refresh(RefreshCause::Cart);
    }

    fn refresh(&mut self, cause: RefreshCause) {
        let view = CartView {
            cause,
            lines: self.cart.lines(),
            totals: self.cart.totals(&self.pricing),
            item_count: self.cart.item_count(),
            catalog: &self.catalog,
        };
        if let Some(f) = self.on_refresh.as_mut() {
            f(view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::domain::events::CartEvent;
    use crate::storage::MemoryStore;
    use reqwest::StatusCode;
    use rust_decimal::Decimal;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeApi {
        products: Vec<Product>,
        fail_fetch: bool,
        fail_submit: bool,
        submitted: RefCell<Vec<(OrderRequest, Uuid)>>,
    }

    impl StorefrontApi for FakeApi {
        async fn fetch_products(&self) -> std::result::Result<Vec<Product>, ApiError> {
            if self.fail_fetch {
                return Err(ApiError::Status { status: StatusCode::SERVICE_UNAVAILABLE, url: "http://test/api/productlist".into() });
            }
            Ok(self.products.clone())
        }

        async fn submit_order(&self, order: &OrderRequest, reference: Uuid) -> std::result::Result<(), ApiError> {
            if self.fail_submit {
                return Err(ApiError::Status { status: StatusCode::INTERNAL_SERVER_ERROR, url: "http://test/api/send-order-email".into() });
            }
            self.submitted.borrow_mut().push((order.clone(), reference));
            Ok(())
        }
    }

    fn products() -> Vec<Product> {
        vec![
            Product::new(1u64, "Laptop", Decimal::new(10, 0)).with_category("laptop").with_brand("acme"),
            Product::new(2u64, "Mouse", Decimal::new(20, 0)).with_category("mouse").with_brand("acme"),
        ]
    }

    async fn storefront(api: FakeApi, kv: Arc<MemoryStore>) -> Storefront<FakeApi, Arc<MemoryStore>> {
        let mut sf = Storefront::new(api, CartStore::new(kv, "cart"), Pricing::default());
        sf.load_catalog().await.unwrap();
        sf
    }

    #[tokio::test]
    async fn test_scenario_totals() {
        let mut sf = storefront(FakeApi { products: products(), ..Default::default() }, Arc::new(MemoryStore::new())).await;
        sf.add_item(ProductId::new(1)).unwrap();
        sf.add_item(ProductId::new(1)).unwrap();
        sf.add_item(ProductId::new(2)).unwrap();
        let lines: Vec<_> = sf.cart().lines().iter().map(|l| (l.id().value(), l.quantity().value())).collect();
        assert_eq!(lines, vec![(1, 2), (2, 1)]);
        let totals = sf.totals();
        assert_eq!(totals.subtotal, Decimal::new(40, 0));
        assert_eq!(totals.tax, Decimal::new(52, 1));
        assert_eq!(totals.total, Decimal::new(552, 1));
    }

    #[tokio::test]
    async fn test_mutations_persist_before_refresh() {
        let kv = Arc::new(MemoryStore::new());
        let mut sf = storefront(FakeApi { products: products(), ..Default::default() }, kv.clone()).await;
        let refreshes = Rc::new(Cell::new(0));
        let seen = refreshes.clone();
        let store = CartStore::new(kv.clone(), "cart");
        sf.on_refresh(move |view| {
            seen.set(seen.get() + 1);
            assert_eq!(store.load().lines(), view.lines);
        });

        sf.add_item(ProductId::new(1)).unwrap();
        sf.add_item(ProductId::new(2)).unwrap();
        assert!(sf.adjust_quantity(0, 3));
        assert!(sf.remove_item(1));
        assert_eq!(refreshes.get(), 4);

        assert!(!sf.adjust_quantity(7, 1));
        assert!(!sf.remove_item(7));
        assert_eq!(refreshes.get(), 4);
    }

    #[tokio::test]
    async fn test_catalog_load_refreshes() {
        let mut sf = Storefront::new(
            FakeApi { products: products(), ..Default::default() },
            CartStore::new(MemoryStore::new(), "cart"),
            Pricing::default(),
        );
        let seen = Rc::new(RefCell::new(Vec::new()));
        let recorder = seen.clone();
        sf.on_refresh(move |view| recorder.borrow_mut().push((view.cause, view.catalog.len())));

        assert_eq!(sf.load_catalog().await.unwrap(), 2);
        assert_eq!(*seen.borrow(), vec![(RefreshCause::Catalog, 2)]);

        sf.add_item(ProductId::new(1)).unwrap();
        assert_eq!(seen.borrow().last(), Some(&(RefreshCause::Cart, 2)));
    }

    #[tokio::test]
    async fn test_failed_catalog_load_does_not_refresh() {
        let mut sf = Storefront::new(
            FakeApi { products: products(), fail_fetch: true, ..Default::default() },
            CartStore::new(MemoryStore::new(), "cart"),
            Pricing::default(),
        );
        let refreshes = Rc::new(Cell::new(0));
        let seen = refreshes.clone();
        sf.on_refresh(move |_| seen.set(seen.get() + 1));
        assert!(sf.load_catalog().await.is_err());
        assert_eq!(refreshes.get(), 0);
    }

    #[tokio::test]
    async fn test_zero_delta_persists_and_refreshes() {
        let kv = Arc::new(MemoryStore::new());
        let mut sf = storefront(FakeApi { products: products(), ..Default::default() }, kv.clone()).await;
        sf.add_item(ProductId::new(1)).unwrap();
        kv.remove("cart").unwrap();
        let refreshes = Rc::new(Cell::new(0));
        let seen = refreshes.clone();
        sf.on_refresh(move |_| seen.set(seen.get() + 1));

        assert!(sf.adjust_quantity(0, 0));
        assert_eq!(refreshes.get(), 1);
        assert!(kv.get("cart").unwrap().is_some());
        assert_eq!(sf.cart().lines()[0].quantity().value(), 1);
    }

    #[tokio::test]
    async fn test_overflowing_storage_does_not_crash_start() {
        let kv = Arc::new(MemoryStore::new());
        kv.set("cart", r#"[{"id": 1, "name": "x", "price": 5e28, "quantity": 2}]"#).unwrap();
        let mut sf = Storefront::new(
            FakeApi { products: products(), ..Default::default() },
            CartStore::new(kv.clone(), "cart"),
            Pricing::default(),
        );
        sf.on_refresh(|view| assert!(view.lines.is_empty()));
        sf.start().await.unwrap();
        assert!(sf.cart().is_empty());
        assert_eq!(sf.totals().total, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let kv = Arc::new(MemoryStore::new());
        let mut sf = storefront(FakeApi { products: products(), ..Default::default() }, kv.clone()).await;
        let err = sf.add_item(ProductId::new(42)).unwrap_err();
        assert!(matches!(err, StorefrontError::NotFound(id) if id == ProductId::new(42)));
        assert!(sf.cart().is_empty());
        assert!(kv.get("cart").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cart_restored_and_reloaded() {
        let kv = Arc::new(MemoryStore::new());
        let mut first = storefront(FakeApi { products: products(), ..Default::default() }, kv.clone()).await;
        first.add_item(ProductId::new(2)).unwrap();

        let mut second = storefront(FakeApi { products: products(), ..Default::default() }, kv.clone()).await;
        assert_eq!(second.cart().len(), 1);

        first.add_item(ProductId::new(1)).unwrap();
        assert_eq!(second.cart().len(), 1);
        second.reload_cart();
        assert_eq!(second.cart().len(), 2);
    }

    #[tokio::test]
    async fn test_adjust_to_zero_removes_line() {
        let mut sf = storefront(FakeApi { products: products(), ..Default::default() }, Arc::new(MemoryStore::new())).await;
        sf.add_item(ProductId::new(1)).unwrap();
        sf.add_item(ProductId::new(1)).unwrap();
        sf.add_item(ProductId::new(2)).unwrap();
        assert!(sf.adjust_quantity(0, -5));
        assert_eq!(sf.cart().len(), 1);
        assert_eq!(sf.cart().lines()[0].id(), ProductId::new(2));
    }

    #[tokio::test]
    async fn test_start_restores_cart_even_if_fetch_fails() {
        let kv = Arc::new(MemoryStore::new());
        let mut first = storefront(FakeApi { products: products(), ..Default::default() }, kv.clone()).await;
        first.add_item(ProductId::new(1)).unwrap();

        let api = FakeApi { products: products(), fail_fetch: true, ..Default::default() };
        let mut sf = Storefront::new(api, CartStore::new(kv.clone(), "cart"), Pricing::default());
        let refreshes = Rc::new(Cell::new(0));
        let seen = refreshes.clone();
        sf.on_refresh(move |_| seen.set(seen.get() + 1));

        assert!(matches!(sf.start().await, Err(StorefrontError::FetchFailed(_))));
        assert_eq!(sf.cart().len(), 1);
        assert_eq!(refreshes.get(), 1);
    }

    #[tokio::test]
    async fn test_catalog_fetch_failure() {
        let mut sf = Storefront::new(
            FakeApi { products: products(), fail_fetch: true, ..Default::default() },
            CartStore::new(MemoryStore::new(), "cart"),
            Pricing::default(),
        );
        let err = sf.load_catalog().await.unwrap_err();
        assert!(matches!(err, StorefrontError::FetchFailed(_)));
        assert!(sf.catalog().is_empty());
        assert!(matches!(sf.add_item(ProductId::new(1)), Err(StorefrontError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_checkout_empty_cart() {
        let mut sf = storefront(FakeApi { products: products(), ..Default::default() }, Arc::new(MemoryStore::new())).await;
        let err = sf.checkout("buyer@example.com").await.unwrap_err();
        assert!(matches!(err, StorefrontError::UserError(ref msg) if msg == "cart is empty"));
        assert!(sf.api().submitted.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_invalid_email() {
        let mut sf = storefront(FakeApi { products: products(), ..Default::default() }, Arc::new(MemoryStore::new())).await;
        sf.add_item(ProductId::new(1)).unwrap();
        let err = sf.checkout("nobody").await.unwrap_err();
        assert!(matches!(err, StorefrontError::UserError(_)));
        assert!(sf.api().submitted.borrow().is_empty());
        assert_eq!(sf.cart().len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_success_clears_cart() {
        let kv = Arc::new(MemoryStore::new());
        let mut sf = storefront(FakeApi { products: products(), ..Default::default() }, kv.clone()).await;
        sf.add_item(ProductId::new(1)).unwrap();
        sf.add_item(ProductId::new(2)).unwrap();
        sf.take_events();

        let confirmation = sf.checkout("buyer@example.com").await.unwrap();
        assert_eq!(confirmation.total, Decimal::new(439, 1));
        assert_eq!(confirmation.item_count, 2);

        let submitted = sf.api().submitted.borrow();
        assert_eq!(submitted.len(), 1);
        let (order, reference) = &submitted[0];
        assert_eq!(*reference, confirmation.reference);
        assert_eq!(order.email, "buyer@example.com");
        assert_eq!(order.items.len(), 2);
        drop(submitted);

        assert!(sf.cart().is_empty());
        assert!(kv.get("cart").unwrap().is_none());
        let events = sf.take_events();
        assert_eq!(events.first(), Some(&DomainEvent::Cart(CartEvent::Cleared)));
        assert!(matches!(events.last(), Some(DomainEvent::Order(OrderEvent::Placed { reference, .. })) if *reference == confirmation.reference));
    }

    #[tokio::test]
    async fn test_checkout_failure_keeps_cart() {
        let kv = Arc::new(MemoryStore::new());
        let api = FakeApi { products: products(), fail_submit: true, ..Default::default() };
        let mut sf = storefront(api, kv.clone()).await;
        sf.add_item(ProductId::new(1)).unwrap();
        let stored = kv.get("cart").unwrap();

        let err = sf.checkout("buyer@example.com").await.unwrap_err();
        assert!(matches!(err, StorefrontError::SubmissionFailed(_)));
        assert_eq!(sf.cart().len(), 1);
        assert_eq!(kv.get("cart").unwrap(), stored);
    }

    #[tokio::test]
    async fn test_clear_cart_persists_empty_state() {
        let kv = Arc::new(MemoryStore::new());
        let mut sf = storefront(FakeApi { products: products(), ..Default::default() }, kv.clone()).await;
        sf.add_item(ProductId::new(1)).unwrap();
        sf.clear_cart();
        assert_eq!(kv.get("cart").unwrap().as_deref(), Some("[]"));
        assert!(sf.view().lines.is_empty());
        assert_eq!(sf.view().totals.total, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_products_and_detail() {
        let sf = storefront(FakeApi { products: products(), ..Default::default() }, Arc::new(MemoryStore::new())).await;
        let view = sf.products(&ProductFilter::from_query("?category=MOUSE"), None);
        assert_eq!(view.len(), 1);
        assert_eq!(sf.product_detail(ProductId::new(1)).unwrap().name, "Laptop");
        assert!(matches!(sf.product_detail(ProductId::new(5)), Err(StorefrontError::NotFound(_))));
    }
}
