//! Order intake
//!
//! Placing an order is the only operation that spans two related writes:
//! the order header and its line items. Both go through one
//! [`OrderWriter`](crate::core::store::OrderWriter) unit of work, so a
//! failure at any step leaves nothing behind.
//!
//! ```rust,ignore
//! let intake = OrderIntake::new(store).with_policy(OrderPolicy::default());
//! let receipt = intake
//!     .place_order(PlaceOrder::new("u1", vec![CartItem::new("Pen", dec!(1.5), 2)], dec!(3.0)))
//!     .await?;
//! ```

use crate::core::error::{FieldValidationError, OrderError, StoreError, ValidationError};
use crate::core::model::{
    BuyerId, CartItem, NewOrderItem, Order, OrderId, OrderItem, OrderReceipt, OrderStatus,
};
use crate::core::store::{OrderStore, OrderWriter, StoreResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Decimal places an amount may carry; the SQL columns are `DECIMAL(12, 2)`
pub const AMOUNT_SCALE: u32 = 2;

/// Amounts must stay strictly below this bound to fit the same columns
pub const AMOUNT_LIMIT: i64 = 10_000_000_000;

/// What to do with a cart that has no items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCartPolicy {
    /// Write the header only; the item batch is skipped
    #[default]
    Allow,
    /// Fail validation
    Reject,
}

/// How the caller-supplied total is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalCheck {
    /// Reject a total that differs from Σ(unit price × quantity)
    #[default]
    Verify,
    /// Store the caller's total unchanged
    Trust,
}

/// Tunables for [`OrderIntake`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderPolicy {
    pub empty_cart: EmptyCartPolicy,
    pub total_check: TotalCheck,
    /// Upper bound for each individual store operation
    pub store_timeout_ms: u64,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            empty_cart: EmptyCartPolicy::Allow,
            total_check: TotalCheck::Verify,
            store_timeout_ms: 5_000,
        }
    }
}

impl OrderPolicy {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Input of one order placement
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOrder {
    pub buyer_id: BuyerId,
    pub items: Vec<CartItem>,
    pub total: Decimal,
}

impl PlaceOrder {
    pub fn new(buyer_id: impl Into<String>, items: Vec<CartItem>, total: Decimal) -> Self {
        Self {
            buyer_id: BuyerId::new(buyer_id),
            items,
            total,
        }
    }
}

/// A committed order together with its line items
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Places orders against an [`OrderStore`]
#[derive(Clone)]
pub struct OrderIntake {
    store: Arc<dyn OrderStore>,
    policy: OrderPolicy,
}

impl OrderIntake {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self {
            store,
            policy: OrderPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: OrderPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &OrderPolicy {
        &self.policy
    }

    /// Validate the input, then write the header and the items in one unit of work
    ///
    /// Returns the generated order id only after the store confirmed the
    /// commit. Any failure rolls back whatever was written before it.
    #[tracing::instrument(
        name = "order_intake::place_order",
        skip(self, order),
        fields(buyer_id = %order.buyer_id, items = order.items.len())
    )]
    pub async fn place_order(&self, order: PlaceOrder) -> Result<OrderReceipt, OrderError> {
        self.validate(&order)?;

        let timeout = self.policy.store_timeout();

        let mut writer = bounded(timeout, "begin", self.store.begin())
            .await
            .map_err(OrderError::StoreUnavailable)?;

        let header = bounded(
            timeout,
            "insert_order_header",
            writer.insert_order_header(&order.buyer_id, order.total),
        )
        .await;
        let order_id = match header {
            Ok(id) => id,
            Err(e) => {
                discard(writer, timeout, None).await;
                return Err(OrderError::HeaderWriteFailed(e));
            }
        };

        if order.items.is_empty() {
            tracing::debug!(%order_id, "empty cart, skipping item batch");
        } else {
            let rows: Vec<NewOrderItem> = order.items.iter().map(NewOrderItem::from).collect();
            let inserted = bounded(
                timeout,
                "insert_order_items",
                writer.insert_order_items(order_id, &rows),
            )
            .await;
            if let Err(source) = inserted {
                discard(writer, timeout, Some(order_id)).await;
                return Err(OrderError::ItemsWriteFailed { order_id, source });
            }
        }

        bounded(timeout, "commit", writer.commit())
            .await
            .map_err(|source| OrderError::CommitFailed { order_id, source })?;

        tracing::info!(%order_id, total = %order.total, "order placed");

        Ok(OrderReceipt {
            order_id,
            status: OrderStatus::Placed,
        })
    }

    /// Read back a committed order and its items
    pub async fn order_details(&self, id: OrderId) -> StoreResult<Option<OrderDetails>> {
        let timeout = self.policy.store_timeout();

        let Some(order) = bounded(timeout, "get_order", self.store.get_order(id)).await? else {
            return Ok(None);
        };
        let items = bounded(timeout, "list_order_items", self.store.list_order_items(id)).await?;

        Ok(Some(OrderDetails { order, items }))
    }

    fn validate(&self, order: &PlaceOrder) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if order.buyer_id.is_blank() {
            errors.push(FieldValidationError::new("buyerId", "required"));
        }

        if order.items.is_empty() && self.policy.empty_cart == EmptyCartPolicy::Reject {
            errors.push(FieldValidationError::new(
                "cartItems",
                "must contain at least one item",
            ));
        }

        for (index, item) in order.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                errors.push(FieldValidationError::new(
                    format!("cartItems[{}].name", index),
                    "required",
                ));
            }
            if item.quantity == 0 {
                errors.push(FieldValidationError::new(
                    format!("cartItems[{}].quantity", index),
                    "must be a positive integer",
                ));
            }
            check_amount(format!("cartItems[{}].price", index), item.unit_price, &mut errors);
        }

        check_amount("total".to_string(), order.total, &mut errors);

        if errors.is_empty() && self.policy.total_check == TotalCheck::Verify {
            match cart_total(&order.items) {
                Some(expected) if expected == order.total => {}
                Some(expected) => errors.push(FieldValidationError::new(
                    "total",
                    format!("does not match cart items (expected {})", expected),
                )),
                None => errors.push(FieldValidationError::new("total", "amount out of range")),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::from_fields(errors))
        }
    }
}

/// Reject an amount the stores cannot hold exactly
fn check_amount(field: String, amount: Decimal, errors: &mut Vec<FieldValidationError>) {
    if amount.is_sign_negative() {
        errors.push(FieldValidationError::new(field, "must not be negative"));
    } else if amount >= Decimal::from(AMOUNT_LIMIT) {
        errors.push(FieldValidationError::new(field, "amount out of range"));
    } else if amount.normalize().scale() > AMOUNT_SCALE {
        errors.push(FieldValidationError::new(
            field,
            format!("must have at most {} decimal places", AMOUNT_SCALE),
        ));
    }
}

/// Σ(unit price × quantity), `None` on overflow
fn cart_total(items: &[CartItem]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.line_total()?))
}

/// Run a store operation under `after`, reporting expiry as [`StoreError::Timeout`]
async fn bounded<T>(
    after: Duration,
    operation: &'static str,
    fut: impl Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout { operation, after }),
    }
}

/// Roll back a failed unit of work. A failed rollback is logged, not returned:
/// the caller already has the error that matters.
async fn discard(writer: Box<dyn OrderWriter>, timeout: Duration, order_id: Option<OrderId>) {
    if let Err(e) = bounded(timeout, "rollback", writer.rollback()).await {
        tracing::warn!(order_id = ?order_id, error = %e, "rollback failed");
    }
}
