//! Integration test infrastructure for storage backends.
//!
//! Builds the real application router over a given store so the REST macro
//! can exercise it through `axum_test::TestServer`.
//!
//! # Architecture
//!
//! ```text
//! axum_test::TestServer
//!     └─ Router (built by build_test_router via ServerBuilder)
//!         ├─ POST /place-order
//!         ├─ GET  /orders/{id}
//!         ├─ POST /signup, POST /login
//!         └─ GET  /products, GET /products/{id}
//! ```

#[macro_use]
pub mod rest_tests;

use axum::Router;
use storefront::core::auth::TokenSigner;
use storefront::core::orders::OrderPolicy;
use storefront::core::store::{OrderStore, ProductStore, UserStore};
use storefront::server::ServerBuilder;

pub const TEST_TOKEN_SECRET: &str = "integration-test-secret";

/// Build the application Router for the given storage backend.
///
/// # Usage
/// ```rust,ignore
/// let router = build_test_router(InMemoryStore::new());
/// let server = axum_test::TestServer::new(router).unwrap();
/// ```
pub fn build_test_router<S>(store: S) -> Router
where
    S: OrderStore + UserStore + ProductStore + 'static,
{
    build_test_router_with_policy(store, OrderPolicy::default())
}

pub fn build_test_router_with_policy<S>(store: S, policy: OrderPolicy) -> Router
where
    S: OrderStore + UserStore + ProductStore + 'static,
{
    ServerBuilder::new()
        .with_store(store)
        .with_policy(policy)
        .with_token_signer(TokenSigner::new(TEST_TOKEN_SECRET, 3600))
        .build()
        .expect("test router should build")
}
