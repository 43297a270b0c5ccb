//! PostgreSQL storage backend using sqlx.
//!
//! Provides `PostgresStore`, backed by a `sqlx::PgPool`. Generated ids come
//! back through `RETURNING id`; quantities are `INTEGER` with a positive
//! check constraint.
//!
//! # Feature flag
//!
//! ```toml
//! [dependencies]
//! storefront-rs = { version = "0.1", features = ["postgres"] }
//! ```

use crate::config::DatabaseConfig;
use crate::core::error::StoreError;
use crate::core::model::{
    BuyerId, NewOrderItem, NewProduct, NewUser, Order, OrderId, OrderItem, Product, ProductId,
    User, UserId,
};
use crate::core::store::{OrderStore, OrderWriter, ProductStore, StoreResult, UserStore};
use crate::storage::{map_sqlx_error, pool_options};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgConnectOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::str::FromStr;

const BACKEND: &str = "PostgreSQL";

/// Apply the required tables and indexes (idempotent).
pub async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            username VARCHAR(255) NOT NULL,
            email VARCHAR(255) NOT NULL UNIQUE,
            password VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        "CREATE TABLE IF NOT EXISTS products (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            description TEXT NULL,
            price NUMERIC(12,2) NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS orders (
            id BIGSERIAL PRIMARY KEY,
            user_id VARCHAR(255) NOT NULL,
            total NUMERIC(12,2) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        "CREATE INDEX IF NOT EXISTS idx_orders_user ON orders (user_id)",
        "CREATE TABLE IF NOT EXISTS order_items (
            order_id BIGINT NOT NULL REFERENCES orders (id),
            product_name VARCHAR(255) NOT NULL,
            price NUMERIC(12,2) NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity > 0)
        )",
        "CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items (order_id)",
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error(BACKEND, e))?;
    }

    Ok(())
}

/// Connection options from configuration
///
/// `url` wins when set. Otherwise the parts are passed as discrete options,
/// so credentials never need URL escaping.
pub fn connect_options(config: &DatabaseConfig) -> StoreResult<PgConnectOptions> {
    if let Some(url) = &config.url {
        return PgConnectOptions::from_str(url).map_err(|e| {
            StoreError::unavailable(BACKEND, format!("invalid database url: {}", e))
        });
    }

    let options = PgConnectOptions::new()
        .host(&config.host)
        .username(&config.user)
        .database(&config.name);
    Ok(match &config.password {
        Some(password) => options.password(password),
        None => options,
    })
}

/// Store backed by PostgreSQL.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a bounded, health-checked pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = pool_options::<Postgres>(config)
            .connect_with(connect_options(config)?)
            .await
            .map_err(|e| map_sqlx_error(BACKEND, e))?;

        tracing::info!(
            max_connections = config.max_connections,
            "PostgreSQL connection pool initialized"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_column_quantity(quantity: u32) -> StoreResult<i32> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::query(BACKEND, format!("quantity {} out of range", quantity)))
}

fn from_column_quantity(quantity: i32) -> StoreResult<u32> {
    u32::try_from(quantity).map_err(|_| {
        StoreError::query(BACKEND, format!("stored quantity {} is negative", quantity))
    })
}

/// One order placement inside a PostgreSQL transaction
pub struct PostgresOrderWriter {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderWriter for PostgresOrderWriter {
    async fn insert_order_header(
        &mut self,
        buyer_id: &BuyerId,
        total: Decimal,
    ) -> StoreResult<OrderId> {
        let id: i64 =
            sqlx::query_scalar("INSERT INTO orders (user_id, total) VALUES ($1, $2) RETURNING id")
                .bind(buyer_id.as_str())
                .bind(total)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error(BACKEND, e))?;

        Ok(OrderId(id))
    }

    async fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: &[NewOrderItem],
    ) -> StoreResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let rows = items
            .iter()
            .map(|item| {
                Ok((
                    item.product_name.clone(),
                    item.price,
                    to_column_quantity(item.quantity)?,
                ))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO order_items (order_id, product_name, price, quantity) ");
        builder.push_values(rows, |mut row, (name, price, quantity)| {
            row.push_bind(order_id.0)
                .push_bind(name)
                .push_bind(price)
                .push_bind(quantity);
        });

        builder
            .build()
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(BACKEND, e))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let writer = *self;
        writer
            .tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error(BACKEND, e))
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let writer = *self;
        writer
            .tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error(BACKEND, e))
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn OrderWriter>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(BACKEND, e))?;
        Ok(Box::new(PostgresOrderWriter { tx }))
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query_as::<_, (i64, String, Decimal, DateTime<Utc>)>(
            "SELECT id, user_id, total, created_at FROM orders WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(BACKEND, e))?;

        Ok(row.map(|(id, buyer, total, created_at)| Order {
            id: OrderId(id),
            buyer_id: BuyerId::new(buyer),
            total,
            created_at,
        }))
    }

    async fn list_order_items(&self, id: OrderId) -> StoreResult<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, (i64, String, Decimal, i32)>(
            "SELECT order_id, product_name, price, quantity FROM order_items WHERE order_id = $1",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(BACKEND, e))?;

        rows.into_iter()
            .map(|(order_id, product_name, price, quantity)| {
                Ok(OrderItem {
                    order_id: OrderId(order_id),
                    product_name,
                    price,
                    quantity: from_column_quantity(quantity)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, email, password) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(BACKEND, e))?;

        Ok(UserId(id))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, (i64, String, String, String, DateTime<Utc>)>(
            "SELECT id, username, email, password, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(BACKEND, e))?;

        Ok(row.map(|(id, username, email, password_hash, created_at)| User {
            id: UserId(id),
            username,
            email,
            password_hash,
            created_at,
        }))
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, (i64, String, Option<String>, Decimal)>(
            "SELECT id, name, description, price FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(BACKEND, e))?;

        Ok(rows
            .into_iter()
            .map(|(id, name, description, price)| Product {
                id: ProductId(id),
                name,
                description,
                price,
            })
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, (i64, String, Option<String>, Decimal)>(
            "SELECT id, name, description, price FROM products WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(BACKEND, e))?;

        Ok(row.map(|(id, name, description, price)| Product {
            id: ProductId(id),
            name,
            description,
            price,
        }))
    }

    async fn insert_product(&self, product: NewProduct) -> StoreResult<ProductId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO products (name, description, price) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(BACKEND, e))?;

        Ok(ProductId(id))
    }
}
