//! Shared test harness for storage backend testing
//!
//! Provides cart fixtures, a fault-injecting store wrapper and the contract
//! test macros every backend runs:
//!
//! - `order_store_tests!`: order placement through `OrderIntake` plus the
//!   raw unit-of-work behaviour of `OrderStore`
//! - `account_store_tests!`: `UserStore`, `ProductStore` and the account
//!   service on top of them
//! - `rest_integration_tests!`: the HTTP API end to end
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//! ```

#![allow(dead_code)]



#[macro_use]
pub mod integration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use storefront::core::error::StoreError;
use storefront::core::model::{
    BuyerId, CartItem, NewOrderItem, NewProduct, NewUser, Order, OrderId, OrderItem, Product,
    ProductId, User, UserId,
};
use storefront::core::orders::PlaceOrder;
use storefront::core::store::{OrderStore, OrderWriter, ProductStore, StoreResult, UserStore};
use storefront::storage::InMemoryStore;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Parse a decimal literal
pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// One pen at 1.50, quantity 2 (total 3.00)
pub fn pen_cart() -> Vec<CartItem> {
    vec![CartItem::new("Pen", dec("1.50"), 2)]
}

/// Three lines with a total of 12.94
pub fn sample_cart() -> Vec<CartItem> {
    vec![
        CartItem::new("Pen", dec("1.50"), 2),
        CartItem::new("Notebook", dec("4.99"), 1),
        CartItem::new("Eraser", dec("0.99"), 5),
    ]
}

/// Σ(unit price × quantity)
pub fn cart_total(items: &[CartItem]) -> Decimal {
    items
        .iter()
        .map(|item| item.line_total().expect("fixture amounts fit"))
        .sum()
}

/// A placement whose total matches its items
pub fn order_for(buyer: &str, items: Vec<CartItem>) -> PlaceOrder {
    let total = cart_total(&items);
    PlaceOrder::new(buyer, items, total)
}

pub fn sample_products() -> Vec<NewProduct> {
    vec![
        NewProduct::new("Pen", dec("1.50")).with_description("Blue ballpoint pen"),
        NewProduct::new("Notebook", dec("4.99")),
    ]
}

/// Assert that a list contains exactly `n` items.
pub fn assert_count<T>(list: &[T], expected: usize) {
    assert_eq!(
        list.len(),
        expected,
        "Expected {} items, got {}",
        expected,
        list.len()
    );
}

// ---------------------------------------------------------------------------
// FaultyStore: an InMemoryStore that fails at a chosen step
// ---------------------------------------------------------------------------

/// The step at which `FaultyStore` fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Begin,
    Header,
    Items,
    Commit,
}

/// Wraps an [`InMemoryStore`] and fails the configured step with a store error.
///
/// Everything else is delegated, so committed state can be inspected through
/// [`FaultyStore::inner`].
#[derive(Clone)]
pub struct FaultyStore {
    inner: InMemoryStore,
    fault: Option<Fault>,
    rollbacks: Arc<AtomicUsize>,
}

impl FaultyStore {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: InMemoryStore::new(),
            fault: Some(fault),
            rollbacks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn healthy() -> Self {
        Self {
            inner: InMemoryStore::new(),
            fault: None,
            rollbacks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    /// How many units of work were rolled back
    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    fn fails_at(&self, step: Fault) -> bool {
        self.fault == Some(step)
    }
}

fn injected(step: &str) -> StoreError {
    StoreError::query("faulty", format!("injected failure at {}", step))
}

pub struct FaultyWriter {
    inner: Box<dyn OrderWriter>,
    fault: Option<Fault>,
    rollbacks: Arc<AtomicUsize>,
}

#[async_trait]
impl OrderWriter for FaultyWriter {
    async fn insert_order_header(
        &mut self,
        buyer_id: &BuyerId,
        total: Decimal,
    ) -> StoreResult<OrderId> {
        if self.fault == Some(Fault::Header) {
            return Err(injected("insert_order_header"));
        }
        self.inner.insert_order_header(buyer_id, total).await
    }

    async fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> StoreResult<()> {
        if self.fault == Some(Fault::Items) {
            return Err(injected("insert_order_items"));
        }
        self.inner.insert_order_items(order_id, items).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let writer = *self;
        if writer.fault == Some(Fault::Commit) {
            // The backend discards the transaction when commit fails
            writer.inner.rollback().await?;
            return Err(injected("commit"));
        }
        writer.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let writer = *self;
        writer.rollbacks.fetch_add(1, Ordering::SeqCst);
        writer.inner.rollback().await
    }
}

#[async_trait]
impl OrderStore for FaultyStore {
    async fn begin(&self) -> StoreResult<Box<dyn OrderWriter>> {
        if self.fails_at(Fault::Begin) {
            return Err(StoreError::unavailable("faulty", "connection refused"));
        }
        let inner = self.inner.begin().await?;
        Ok(Box::new(FaultyWriter {
            inner,
            fault: self.fault,
            rollbacks: self.rollbacks.clone(),
        }))
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        self.inner.get_order(id).await
    }

    async fn list_order_items(&self, id: OrderId) -> StoreResult<Vec<OrderItem>> {
        self.inner.list_order_items(id).await
    }
}

#[async_trait]
impl UserStore for FaultyStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        self.inner.create_user(user).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }
}

#[async_trait]
impl ProductStore for FaultyStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        self.inner.list_products().await
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        self.inner.get_product(id).await
    }

    async fn insert_product(&self, product: NewProduct) -> StoreResult<ProductId> {
        self.inner.insert_product(product).await
    }
}
