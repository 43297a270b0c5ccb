//! In-memory implementation of the store traits for testing and development

use crate::core::error::StoreError;
use crate::core::model::{
    BuyerId, NewOrderItem, NewProduct, NewUser, Order, OrderId, OrderItem, Product, ProductId,
    User, UserId,
};
use crate::core::store::{OrderStore, OrderWriter, ProductStore, StoreResult, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

const BACKEND: &str = "in-memory";

#[derive(Default)]
struct Tables {
    orders: BTreeMap<OrderId, Order>,
    order_items: Vec<OrderItem>,
    users: BTreeMap<UserId, User>,
    products: BTreeMap<ProductId, Product>,
}

/// Sequences behave like auto-increment columns: an id handed out to a
/// unit of work that is later rolled back is never reused.
#[derive(Default)]
struct Sequences {
    orders: AtomicI64,
    users: AtomicI64,
    products: AtomicI64,
}

fn next(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::SeqCst) + 1
}

/// In-memory store implementation
///
/// Useful for testing and development. Uses RwLock for thread-safe access;
/// order writes are staged per unit of work and applied under a single
/// write lock on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    sequences: Arc<Sequences>,
}

impl InMemoryStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the catalog with products (ids assigned in order)
    pub fn with_products(self, products: impl IntoIterator<Item = NewProduct>) -> Self {
        {
            let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
            for product in products {
                let id = ProductId(next(&self.sequences.products));
                tables.products.insert(id, product_row(id, product));
            }
        }
        self
    }

    /// Number of committed order headers
    pub fn order_count(&self) -> usize {
        self.tables.read().map(|t| t.orders.len()).unwrap_or(0)
    }

    /// Number of committed order item rows, across all orders
    pub fn order_item_count(&self) -> usize {
        self.tables.read().map(|t| t.order_items.len()).unwrap_or(0)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|e| {
            StoreError::unavailable(BACKEND, format!("Failed to acquire read lock: {}", e))
        })
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|e| {
            StoreError::unavailable(BACKEND, format!("Failed to acquire write lock: {}", e))
        })
    }
}

fn product_row(id: ProductId, product: NewProduct) -> Product {
    Product {
        id,
        name: product.name,
        description: product.description,
        price: product.price,
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Staged writes of one order placement
pub struct InMemoryOrderWriter {
    store: InMemoryStore,
    header: Option<Order>,
    items: Vec<OrderItem>,
}

#[async_trait]
impl OrderWriter for InMemoryOrderWriter {
    async fn insert_order_header(
        &mut self,
        buyer_id: &BuyerId,
        total: Decimal,
    ) -> StoreResult<OrderId> {
        if self.header.is_some() {
            return Err(StoreError::query(
                BACKEND,
                "unit of work already holds an order header",
            ));
        }

        let id = OrderId(next(&self.store.sequences.orders));
        self.header = Some(Order {
            id,
            buyer_id: buyer_id.clone(),
            total,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> StoreResult<()> {
        // Foreign key: the header must exist, either staged here or committed
        let staged = self.header.as_ref().is_some_and(|h| h.id == order_id);
        if !staged && !self.store.read()?.orders.contains_key(&order_id) {
            return Err(StoreError::constraint(
                BACKEND,
                format!("order_items.order_id {} references no order", order_id),
            ));
        }

        self.items.extend(items.iter().map(|item| OrderItem {
            order_id,
            product_name: item.product_name.clone(),
            price: item.price,
            quantity: item.quantity,
        }));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        let mut tables = this.store.write()?;
        if let Some(header) = this.header {
            tables.orders.insert(header.id, header);
        }
        tables.order_items.extend(this.items);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn OrderWriter>> {
        Ok(Box::new(InMemoryOrderWriter {
            store: self.clone(),
            header: None,
            items: Vec::new(),
        }))
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    async fn list_order_items(&self, id: OrderId) -> StoreResult<Vec<OrderItem>> {
        Ok(self
            .read()?
            .order_items
            .iter()
            .filter(|item| item.order_id == id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        let mut tables = self.write()?;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::constraint(
                BACKEND,
                format!("duplicate entry '{}' for key 'users.email'", user.email),
            ));
        }

        let id = UserId(next(&self.sequences.users));
        let created_at: DateTime<Utc> = Utc::now();
        tables.users.insert(
            id,
            User {
                id,
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                created_at,
            },
        );
        Ok(id)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.read()?.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> StoreResult<ProductId> {
        let mut tables = self.write()?;
        let id = ProductId(next(&self.sequences.products));
        tables.products.insert(id, product_row(id, product));
        Ok(id)
    }
}
