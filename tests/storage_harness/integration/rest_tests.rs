//! REST integration test macro for storage backends.
//!
//! The `rest_integration_tests!` macro generates HTTP-level tests that run
//! the real router over a store:
//! JSON → HTTP request → handler → service → store → HTTP response → JSON.

/// Generate a REST integration test suite for a storage backend.
///
/// `$store_factory` must produce an `impl OrderStore + UserStore + ProductStore + 'static`.
///
/// # Generated Tests
///
/// ## Orders
/// - `test_rest_place_order`: 200 + message, orderId, status
/// - `test_rest_place_order_with_user_id_alias`
/// - `test_rest_get_order_with_items`
/// - `test_rest_place_order_validation_errors`: 400 VALIDATION_ERROR
/// - `test_rest_total_mismatch`: 400, nothing written
/// - `test_rest_amount_out_of_range`: 400, no panic
/// - `test_rest_malformed_body`: 400
/// - `test_rest_order_not_found`: 404 ORDER_NOT_FOUND
///
/// ## Accounts
/// - `test_rest_signup_and_login`
/// - `test_rest_signup_duplicate_email`: 409
/// - `test_rest_login_errors`: 404 / 400
///
/// ## Products
/// - `test_rest_products`
/// - `test_rest_product_not_found`: 404 PRODUCT_NOT_FOUND
///
/// ## Health
/// - `test_rest_health`
#[macro_export]
macro_rules! rest_integration_tests {
    ($store_factory:expr) => {
        mod rest_integration_tests {
            use super::*;
            use axum::http::StatusCode;
            use axum_test::TestServer;
            use rust_decimal::Decimal;
            use serde_json::{Value, json};
            use std::str::FromStr;
            use storefront::core::store::ProductStore;

            async fn make_server() -> TestServer {
                let store = $store_factory;
                let router = storage_harness::integration::build_test_router(store);
                TestServer::new(router).unwrap()
            }

            fn decimal_field(value: &Value) -> Decimal {
                match value {
                    Value::String(s) => Decimal::from_str(s).unwrap(),
                    other => Decimal::from_str(&other.to_string()).unwrap(),
                }
            }

            // ==============================================================
            // Orders
            // ==============================================================

            #[tokio::test]
            async fn test_rest_place_order() {
                let server = make_server().await;

                let response = server
                    .post("/place-order")
                    .json(&json!({
                        "buyerId": "u1",
                        "cartItems": [{ "name": "Pen", "price": "1.50", "quantity": 2 }],
                        "total": "3.00"
                    }))
                    .await;

                response.assert_status(StatusCode::OK);
                let body: Value = response.json();
                assert_eq!(body["message"], "Order placed successfully");
                assert_eq!(body["status"], "placed");
                assert!(body["orderId"].as_i64().is_some());
            }

            #[tokio::test]
            async fn test_rest_place_order_with_user_id_alias() {
                let server = make_server().await;

                let response = server
                    .post("/place-order")
                    .json(&json!({
                        "userId": 42,
                        "cartItems": [{ "name": "Pen", "price": 1.5, "quantity": 2 }],
                        "total": 3
                    }))
                    .await;

                response.assert_status(StatusCode::OK);
                let order_id = response.json::<Value>()["orderId"].as_i64().unwrap();

                let details: Value = server.get(&format!("/orders/{}", order_id)).await.json();
                assert_eq!(details["order"]["buyerId"], "42");
            }

            #[tokio::test]
            async fn test_rest_get_order_with_items() {
                let server = make_server().await;

                let placed: Value = server
                    .post("/place-order")
                    .json(&json!({
                        "buyerId": "u7",
                        "cartItems": [
                            { "name": "Pen", "price": "1.50", "quantity": 2 },
                            { "name": "Notebook", "price": "4.99", "quantity": 1 }
                        ],
                        "total": "7.99"
                    }))
                    .await
                    .json();
                let order_id = placed["orderId"].as_i64().unwrap();

                let response = server.get(&format!("/orders/{}", order_id)).await;
                response.assert_status(StatusCode::OK);

                let body: Value = response.json();
                assert_eq!(body["order"]["id"], order_id);
                assert_eq!(
                    decimal_field(&body["order"]["total"]),
                    Decimal::from_str("7.99").unwrap()
                );

                let items = body["items"].as_array().unwrap();
                assert_eq!(items.len(), 2);
                for item in items {
                    assert_eq!(item["orderId"], order_id);
                }
            }

            #[tokio::test]
            async fn test_rest_place_order_validation_errors() {
                let server = make_server().await;

                // Missing buyer
                let response = server
                    .post("/place-order")
                    .json(&json!({
                        "cartItems": [{ "name": "Pen", "price": "1.50", "quantity": 2 }],
                        "total": "3.00"
                    }))
                    .await;
                response.assert_status(StatusCode::BAD_REQUEST);
                assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");

                // Zero quantity and blank name, reported together
                let response = server
                    .post("/place-order")
                    .json(&json!({
                        "buyerId": "u1",
                        "cartItems": [{ "name": " ", "price": "1.50", "quantity": 0 }],
                        "total": "0"
                    }))
                    .await;
                response.assert_status(StatusCode::BAD_REQUEST);
                let body: Value = response.json();
                assert_eq!(body["code"], "VALIDATION_ERROR");
                let fields: Vec<&str> = body["details"]["fields"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|f| f["field"].as_str().unwrap())
                    .collect();
                assert!(fields.contains(&"cartItems[0].name"), "{:?}", fields);
                assert!(fields.contains(&"cartItems[0].quantity"), "{:?}", fields);
            }

            #[tokio::test]
            async fn test_rest_total_mismatch() {
                let server = make_server().await;

                let response = server
                    .post("/place-order")
                    .json(&json!({
                        "buyerId": "u1",
                        "cartItems": [{ "name": "Pen", "price": "1.50", "quantity": 2 }],
                        "total": "2.00"
                    }))
                    .await;

                response.assert_status(StatusCode::BAD_REQUEST);
                let body: Value = response.json();
                assert_eq!(body["code"], "VALIDATION_ERROR");
                assert_eq!(body["details"]["fields"][0]["field"], "total");
            }

            #[tokio::test]
            async fn test_rest_amount_out_of_range() {
                let server = make_server().await;

                let response = server
                    .post("/place-order")
                    .json(&json!({
                        "buyerId": "u1",
                        "cartItems": [{
                            "name": "Yacht",
                            "price": "40000000000000000000000000000",
                            "quantity": 2
                        }],
                        "total": "40000000000000000000000000000"
                    }))
                    .await;

                response.assert_status(StatusCode::BAD_REQUEST);
                let body: Value = response.json();
                assert_eq!(body["code"], "VALIDATION_ERROR");
                assert_eq!(body["details"]["fields"][0]["field"], "cartItems[0].price");
                assert_eq!(body["details"]["fields"][0]["message"], "amount out of range");
            }

            #[tokio::test]
            async fn test_rest_malformed_body() {
                let server = make_server().await;

                let response = server
                    .post("/place-order")
                    .json(&json!({
                        "buyerId": "u1",
                        "cartItems": [{ "name": "Pen", "price": "1.50", "quantity": -1 }],
                        "total": "3.00"
                    }))
                    .await;
                response.assert_status(StatusCode::BAD_REQUEST);
                assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");

                let response = server.post("/place-order").text("not json").await;
                assert!(response.status_code().is_client_error());
            }

            #[tokio::test]
            async fn test_rest_order_not_found() {
                let server = make_server().await;

                let response = server.get(&format!("/orders/{}", i64::MAX)).await;
                response.assert_status(StatusCode::NOT_FOUND);
                assert_eq!(response.json::<Value>()["code"], "ORDER_NOT_FOUND");
            }

            // ==============================================================
            // Accounts
            // ==============================================================

            #[tokio::test]
            async fn test_rest_signup_and_login() {
                let server = make_server().await;

                let response = server
                    .post("/signup")
                    .json(&json!({
                        "username": "dana",
                        "email": "dana@example.com",
                        "password": "password123"
                    }))
                    .await;
                response.assert_status(StatusCode::CREATED);
                assert_eq!(response.json::<Value>()["message"], "User registered successfully");

                let response = server
                    .post("/login")
                    .json(&json!({ "email": "dana@example.com", "password": "password123" }))
                    .await;
                response.assert_status(StatusCode::OK);
                let body: Value = response.json();
                assert_eq!(body["message"], "Login successful");
                assert!(!body["token"].as_str().unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_rest_signup_duplicate_email() {
                let server = make_server().await;
                let signup = json!({
                    "username": "erin",
                    "email": "erin@example.com",
                    "password": "password123"
                });

                server.post("/signup").json(&signup).await.assert_status(StatusCode::CREATED);

                let response = server.post("/signup").json(&signup).await;
                response.assert_status(StatusCode::CONFLICT);
                assert_eq!(response.json::<Value>()["code"], "EMAIL_TAKEN");
            }

            #[tokio::test]
            async fn test_rest_login_errors() {
                let server = make_server().await;

                server
                    .post("/signup")
                    .json(&json!({
                        "username": "finn",
                        "email": "finn@example.com",
                        "password": "password123"
                    }))
                    .await
                    .assert_status(StatusCode::CREATED);

                let response = server
                    .post("/login")
                    .json(&json!({ "email": "finn@example.com", "password": "wrong-password" }))
                    .await;
                response.assert_status(StatusCode::BAD_REQUEST);
                assert_eq!(response.json::<Value>()["code"], "INVALID_CREDENTIALS");

                let response = server
                    .post("/login")
                    .json(&json!({ "email": "nobody@example.com", "password": "password123" }))
                    .await;
                response.assert_status(StatusCode::NOT_FOUND);
                assert_eq!(response.json::<Value>()["code"], "USER_NOT_FOUND");
            }

            // ==============================================================
            // Products
            // ==============================================================

            #[tokio::test]
            async fn test_rest_products() {
                let store = $store_factory;
                let mut ids = Vec::new();
                for product in sample_products() {
                    ids.push(store.insert_product(product).await.unwrap());
                }
                let router = storage_harness::integration::build_test_router(store);
                let server = TestServer::new(router).unwrap();

                let response = server.get("/products").await;
                response.assert_status(StatusCode::OK);
                let listed: Vec<Value> = response.json();
                assert_eq!(listed.len(), ids.len());

                let response = server.get(&format!("/products/{}", ids[0].0)).await;
                response.assert_status(StatusCode::OK);
                let product: Value = response.json();
                assert_eq!(product["name"], "Pen");
                assert_eq!(decimal_field(&product["price"]), Decimal::from_str("1.50").unwrap());
            }

            #[tokio::test]
            async fn test_rest_product_not_found() {
                let server = make_server().await;

                let response = server.get(&format!("/products/{}", i64::MAX)).await;
                response.assert_status(StatusCode::NOT_FOUND);
                assert_eq!(response.json::<Value>()["code"], "PRODUCT_NOT_FOUND");
            }

            // ==============================================================
            // Health
            // ==============================================================

            #[tokio::test]
            async fn test_rest_health() {
                let server = make_server().await;

                let response = server.get("/health").await;
                response.assert_status(StatusCode::OK);
                assert_eq!(response.json::<Value>()["status"], "ok");

                server.get("/healthz").await.assert_status(StatusCode::OK);
            }
        }
    };
}
