//! Typed error handling for storefront
//!
//! Every failure a caller can observe has its own variant so that clients can
//! branch on the kind instead of parsing messages.
//!
//! # Error Categories
//!
//! - [`StoreError`]: failures reported by a storage backend
//! - [`ValidationError`]: malformed or inconsistent input
//! - [`OrderError`]: outcome of a failed order intake
//! - [`AccountError`]: outcome of a failed signup or login
//! - [`AppError`]: the HTTP-facing union of the above
//!
//! # Example
//!
//! ```rust,ignore
//! match intake.place_order(request).await {
//!     Ok(receipt) => println!("placed {}", receipt.order_id),
//!     Err(OrderError::ItemsWriteFailed { .. }) => {
//!         // the header was rolled back together with the items
//!     }
//!     Err(e) => eprintln!("order failed: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::time::Duration;

use crate::core::model::OrderId;

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors reported by a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached (connect, pool exhausted, closed)
    #[error("storage backend '{backend}' is unavailable: {message}")]
    Unavailable { backend: String, message: String },

    /// A constraint (unique, foreign key, check) rejected the write
    #[error("{backend} constraint violation: {message}")]
    Constraint { backend: String, message: String },

    /// Any other statement failure
    #[error("{backend} query error: {message}")]
    Query { backend: String, message: String },

    /// The operation did not finish within the configured bound
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl StoreError {
    pub fn unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn constraint(backend: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Constraint {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn query(backend: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Query {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            StoreError::Constraint { .. } | StoreError::Query { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// A single field validation error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl FieldValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors related to input validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Validation error for field '{field}': {message}")]
    FieldError { field: String, message: String },

    #[error("Validation errors: {}", join_fields(.0))]
    FieldErrors(Vec<FieldValidationError>),

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

fn join_fields(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::FieldError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Collapse a list of field errors, keeping the single-error shape when possible
    pub fn from_fields(mut errors: Vec<FieldValidationError>) -> Self {
        if errors.len() == 1 {
            let e = errors.remove(0);
            ValidationError::FieldError {
                field: e.field,
                message: e.message,
            }
        } else {
            ValidationError::FieldErrors(errors)
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ValidationError::FieldErrors(errors) => Some(serde_json::json!({ "fields": errors })),
            ValidationError::FieldError { field, message } => Some(serde_json::json!({
                "fields": [{ "field": field, "message": message }]
            })),
            ValidationError::MissingField { field } => Some(serde_json::json!({
                "fields": [{ "field": field, "message": "required" }]
            })),
            ValidationError::InvalidJson { .. } => None,
        }
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = Vec::new();
        flatten_validation_errors(&errors, None, &mut fields);
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::from_fields(fields)
    }
}

/// Walk nested `validator` errors into dotted/indexed field paths
/// (`cartItems[1].quantity`).
fn flatten_validation_errors(
    errors: &validator::ValidationErrors,
    prefix: Option<&str>,
    out: &mut Vec<FieldValidationError>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(p) => format!("{}.{}", p, field),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for e in list {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    out.push(FieldValidationError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                flatten_validation_errors(inner, Some(&path), out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    let indexed = format!("{}[{}]", path, index);
                    flatten_validation_errors(inner, Some(&indexed), out);
                }
            }
        }
    }
}

// =============================================================================
// Order Errors
// =============================================================================

/// Why an order intake did not produce an order
///
/// Each variant names the step that failed. None of them leave rows behind:
/// the two writes share one unit of work that is rolled back on failure.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No unit of work could be opened on the store
    #[error("order store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// Inserting the order header failed; no item rows were attempted
    #[error("failed to place order: {0}")]
    HeaderWriteFailed(#[source] StoreError),

    /// Inserting the line items failed; the header was rolled back
    #[error("failed to save order items for pending order {order_id}: {source}")]
    ItemsWriteFailed {
        order_id: OrderId,
        #[source]
        source: StoreError,
    },

    /// Both writes were accepted but the store refused to commit
    #[error("failed to commit order {order_id}: {source}")]
    CommitFailed {
        order_id: OrderId,
        #[source]
        source: StoreError,
    },
}

impl OrderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderError::Validation(_) => StatusCode::BAD_REQUEST,
            OrderError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            OrderError::HeaderWriteFailed(_)
            | OrderError::ItemsWriteFailed { .. }
            | OrderError::CommitFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            OrderError::Validation(_) => "VALIDATION_ERROR",
            OrderError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            OrderError::HeaderWriteFailed(_) => "ORDER_HEADER_WRITE_FAILED",
            OrderError::ItemsWriteFailed { .. } => "ORDER_ITEMS_WRITE_FAILED",
            OrderError::CommitFailed { .. } => "ORDER_COMMIT_FAILED",
        }
    }

    /// Client-facing text. Store failures get a fixed message; the pending
    /// order id and backend detail only go to the log.
    pub fn public_message(&self) -> String {
        match self {
            OrderError::Validation(e) => e.to_string(),
            OrderError::StoreUnavailable(_) => "Order store is unavailable".to_string(),
            OrderError::HeaderWriteFailed(_) | OrderError::CommitFailed { .. } => {
                "Failed to place order".to_string()
            }
            OrderError::ItemsWriteFailed { .. } => "Failed to save order items".to_string(),
        }
    }

    /// The store failure behind this error, if any
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            OrderError::Validation(_) => None,
            OrderError::StoreUnavailable(e) | OrderError::HeaderWriteFailed(e) => Some(e),
            OrderError::ItemsWriteFailed { source, .. }
            | OrderError::CommitFailed { source, .. } => Some(source),
        }
    }
}

// =============================================================================
// Account Errors
// =============================================================================

/// Errors related to signup and login
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("an account with email '{email}' already exists")]
    EmailTaken { email: String },

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("credential processing failed: {0}")]
    Credentials(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccountError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccountError::Validation(_) => StatusCode::BAD_REQUEST,
            AccountError::EmailTaken { .. } => StatusCode::CONFLICT,
            AccountError::UserNotFound => StatusCode::NOT_FOUND,
            AccountError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AccountError::Credentials(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AccountError::Store(e) => e.status_code(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AccountError::Validation(_) => "VALIDATION_ERROR",
            AccountError::EmailTaken { .. } => "EMAIL_TAKEN",
            AccountError::UserNotFound => "USER_NOT_FOUND",
            AccountError::InvalidCredentials => "INVALID_CREDENTIALS",
            AccountError::Credentials(_) => "CREDENTIALS_ERROR",
            AccountError::Store(_) => "STORAGE_ERROR",
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

/// The HTTP-facing error type
///
/// Wraps the domain errors and knows how to render each of them as a status
/// code plus a JSON body `{ code, message, details? }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{resource} with id '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        AppError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Order(e) => e.status_code(),
            AppError::Account(e) => e.status_code(),
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Store(e) => e.status_code(),
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Order(e) => e.error_code(),
            AppError::Account(e) => e.error_code(),
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound { resource, .. } => match *resource {
                "order" => "ORDER_NOT_FOUND",
                "product" => "PRODUCT_NOT_FOUND",
                _ => "NOT_FOUND",
            },
            AppError::Store(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.public_message(),
            details: self.details(),
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Order(e) => e.public_message(),
            AppError::Store(_) => "Storage operation failed".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Validation(e)
            | AppError::Order(OrderError::Validation(e))
            | AppError::Account(AccountError::Validation(e)) => e.details(),
            AppError::NotFound { resource, id } => Some(serde_json::json!({
                "resource": resource,
                "id": id,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request rejected");
        }
        (status, Json(self.to_response())).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// A specialized Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

// =============================================================================
// Tests
// =============================================================================
