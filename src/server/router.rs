//! Route table for the storefront API

use super::handlers::{
    AppState, get_order, get_product, list_products, login, place_order, signup,
};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};

/// Build the API routes
///
/// - POST /place-order - Place an order (header + items, one unit of work)
/// - GET /orders/{id} - Read back an order with its items
/// - POST /signup - Register a user
/// - POST /login - Exchange credentials for a token
/// - GET /products - List the catalogue
/// - GET /products/{id} - Get one product
pub fn build_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/place-order", post(place_order))
        .route("/orders/{id}", get(get_order))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .with_state(state)
}

/// Build health check routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "storefront"
    }))
}
