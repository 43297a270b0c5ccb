//! HTTP handlers for orders, accounts and the product catalogue
//!
//! Handlers only translate between JSON and the services in [`crate::core`];
//! every rule about what makes an order valid lives in `OrderIntake`.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::extractors::Validated;
use crate::core::auth::{AccountService, Signup};
use crate::core::error::{AppError, AppResult, ValidationError};
use crate::core::model::{BuyerId, CartItem, OrderId, OrderStatus, Product, ProductId};
use crate::core::orders::{OrderDetails, OrderIntake, PlaceOrder};
use crate::core::store::ProductStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderIntake>,
    pub accounts: Arc<AccountService>,
    pub products: Arc<dyn ProductStore>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Request body for `POST /place-order`
///
/// `userId` is accepted as an alias of `buyerId`.
#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[serde(rename = "buyerId", alias = "userId", default)]
    #[validate(required(message = "required"))]
    pub buyer_id: Option<BuyerId>,

    #[serde(rename = "cartItems")]
    #[validate(nested)]
    pub cart_items: Vec<CartItemRequest>,

    pub total: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CartItemRequest {
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl PlaceOrderRequest {
    fn into_command(self) -> Result<PlaceOrder, AppError> {
        let buyer_id = self.buyer_id.ok_or_else(|| {
            AppError::Validation(ValidationError::MissingField {
                field: "buyerId".to_string(),
            })
        })?;

        Ok(PlaceOrder {
            buyer_id,
            items: self
                .cart_items
                .into_iter()
                .map(|item| CartItem::new(item.name, item.price, item.quantity))
                .collect(),
            total: self.total,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub message: &'static str,
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// `POST /place-order`
pub async fn place_order(
    State(state): State<AppState>,
    Validated(request): Validated<PlaceOrderRequest>,
) -> AppResult<Json<PlaceOrderResponse>> {
    let receipt = state.orders.place_order(request.into_command()?).await?;

    Ok(Json(PlaceOrderResponse {
        message: "Order placed successfully",
        order_id: receipt.order_id,
        status: receipt.status,
    }))
}

/// `GET /orders/{id}`
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetails>> {
    state
        .orders
        .order_details(OrderId(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("order", id))
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub username: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "required"))]
    pub email: String,
    #[validate(length(min = 1, message = "required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: &'static str,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
}

/// `POST /signup`
pub async fn signup(
    State(state): State<AppState>,
    Validated(request): Validated<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = state
        .accounts
        .signup(Signup {
            username: request.username,
            email: request.email,
            password: request.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User registered successfully",
            user_id: user_id.0,
        }),
    ))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    Validated(request): Validated<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let outcome = state
        .accounts
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        message: "Login successful",
        token: outcome.token,
    }))
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// `GET /products`
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(state.products.list_products().await?))
}

/// `GET /products/{id}`
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Product>> {
    state
        .products
        .get_product(ProductId(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("product", id))
}
