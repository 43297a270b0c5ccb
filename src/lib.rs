//! # Storefront
//!
//! Order placement service for a small e-commerce backend.
//!
//! ## Features
//!
//! - **Order intake**: header and line items written in one unit of work;
//!   a failure at any step leaves no rows behind
//! - **Distinguishable failures**: validation, store unavailable, header
//!   write, item write and commit failures each have their own error variant
//!   and HTTP error code
//! - **Accounts**: signup with Argon2 password hashing, login issuing signed
//!   tokens
//! - **Product catalogue**: list and fetch products
//! - **Pluggable storage**: in-memory, MySQL and PostgreSQL backends behind
//!   the same store traits
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use storefront::prelude::*;
//!
//! let app = ServerBuilder::new()
//!     .with_store(InMemoryStore::new())
//!     .with_token_signer(TokenSigner::new("secret", 3600))
//!     .build()?;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        AccountService, AppError, AppResult, BuyerId, CartItem, EmptyCartPolicy, Order,
        OrderDetails, OrderError, OrderId, OrderIntake, OrderItem, OrderPolicy, OrderReceipt,
        OrderStatus, OrderStore, OrderWriter, PlaceOrder, Product, ProductId, ProductStore,
        StoreError, StoreResult, TokenSigner, TotalCheck, UserId, UserStore, ValidationError,
    };

    // === Storage ===
    pub use crate::storage::InMemoryStore;
    #[cfg(feature = "mysql")]
    pub use crate::storage::MysqlStore;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresStore;

    // === Config ===
    pub use crate::config::{AppConfig, Backend};

    // === Server ===
    pub use crate::server::{AppState, ServerBuilder, Validated};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use rust_decimal::Decimal;
}
