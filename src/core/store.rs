//! Store traits consumed by the services
//!
//! The services never see SQL. Each backend in [`crate::storage`] implements
//! these traits over its own connection handling.

use crate::core::error::StoreError;
use crate::core::model::{
    BuyerId, NewOrderItem, NewProduct, NewUser, Order, OrderId, OrderItem, Product, ProductId,
    User, UserId,
};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Result type used across the store boundary
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for order headers and their line items
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Open a unit of work for one order placement
    ///
    /// Nothing written through the returned writer is visible to readers
    /// until [`OrderWriter::commit`] succeeds.
    async fn begin(&self) -> StoreResult<Box<dyn OrderWriter>>;

    /// Get a committed order header by id
    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// List the committed line items of an order
    async fn list_order_items(&self, id: OrderId) -> StoreResult<Vec<OrderItem>>;
}

/// Write side of one order placement
///
/// Dropping a writer without committing discards its writes.
#[async_trait]
pub trait OrderWriter: Send {
    /// Insert the order header and return the identifier the store assigned
    async fn insert_order_header(&mut self, buyer_id: &BuyerId, total: Decimal)
    -> StoreResult<OrderId>;

    /// Insert all line items of `order_id` in a single batch statement
    ///
    /// Callers skip this for an empty cart; backends may treat an empty slice
    /// as a no-op.
    async fn insert_order_items(&mut self, order_id: OrderId, items: &[NewOrderItem])
    -> StoreResult<()>;

    /// Make both writes durable and visible
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discard every write made through this writer
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Storage for user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; a duplicate email is reported as [`StoreError::Constraint`]
    async fn create_user(&self, user: NewUser) -> StoreResult<UserId>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
}

/// Storage for the product catalog
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products ordered by id
    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn insert_product(&self, product: NewProduct) -> StoreResult<ProductId>;
}
