//! Axum extractor for validated request bodies
//!
//! `Validated<T>` deserializes a JSON body and runs `validator` rules on it
//! before the handler sees it. Both failures are reported as
//! `VALIDATION_ERROR` responses.

use crate::core::error::{AppError, ValidationError};
use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Axum extractor that parses and validates a JSON body
///
/// # Usage
///
/// ```rust,ignore
/// pub async fn signup(
///     State(state): State<AppState>,
///     Validated(request): Validated<SignupRequest>,
/// ) -> AppResult<impl IntoResponse> {
///     // request already passed its #[validate] rules
/// }
/// ```
#[derive(Debug)]
pub struct Validated<T>(pub T);

impl<T> Validated<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Validated<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for Validated<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            AppError::Validation(ValidationError::InvalidJson {
                message: rejection.body_text(),
            })
        })?;

        payload
            .validate()
            .map_err(|errors| AppError::Validation(errors.into()))?;

        Ok(Validated(payload))
    }
}
