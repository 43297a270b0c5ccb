//! Accounts: signup, login and token issuance
//!
//! Passwords are stored as Argon2 PHC strings. A successful login returns an
//! opaque token `hex(claims).hex(hmac_sha256(claims))` that carries the user
//! id and an expiry. Nothing in the service requires the token; it is issued
//! for clients to present to other systems.

use crate::core::error::{AccountError, FieldValidationError, StoreError, ValidationError};
use crate::core::model::{NewUser, UserId};
use crate::core::store::UserStore;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use validator::ValidateEmail;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted password length at signup
pub const MIN_PASSWORD_LEN: usize = 8;

/// Longest token lifetime a signer will issue (one year)
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Password hashing
// ---------------------------------------------------------------------------

/// Hash a plain-text password with Argon2 and a fresh random salt
pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Credentials(format!("password hashing failed: {}", e)))
}

/// Check a plain-text password against a stored PHC string
///
/// Returns `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
pub fn verify_password(stored_hash: &str, password: &str) -> Result<bool, AccountError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AccountError::Credentials(format!("invalid stored password hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AccountError::Credentials(format!(
            "password verification failed: {}",
            e
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Claims carried by an issued token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id
    pub sub: i64,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

/// Why a token was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Signs and verifies HMAC-SHA256 tokens
#[derive(Clone)]
pub struct TokenSigner {
    secret: Arc<[u8]>,
    ttl: ChronoDuration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// `ttl_secs` is capped at [`MAX_TOKEN_TTL_SECS`]
    pub fn new(secret: impl AsRef<[u8]>, ttl_secs: u64) -> Self {
        let ttl_secs = ttl_secs.min(MAX_TOKEN_TTL_SECS) as i64;
        Self {
            secret: Arc::from(secret.as_ref()),
            ttl: ChronoDuration::seconds(ttl_secs),
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }

    /// Issue a token for `user_id` expiring `ttl` after `now`
    pub fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> String {
        let claims = TokenClaims {
            sub: user_id.0,
            exp: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
                .timestamp(),
        };
        // Serializing two integers cannot fail
        let payload = serde_json::to_vec(&claims).unwrap_or_default();

        let mut mac = self.mac();
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        format!("{}.{}", hex::encode(&payload), hex::encode(signature))
    }

    /// Check signature and expiry, returning the claims
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let (payload_hex, signature_hex) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let payload = hex::decode(payload_hex).map_err(|_| TokenError::Malformed)?;
        let signature = hex::decode(signature_hex).map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac();
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

// ---------------------------------------------------------------------------
// Account service
// ---------------------------------------------------------------------------

/// Input of a signup
#[derive(Debug, Clone)]
pub struct Signup {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: UserId,
    pub token: String,
}

/// Signup and login over a [`UserStore`]
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    signer: TokenSigner,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, signer: TokenSigner) -> Self {
        Self { users, signer }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    #[tracing::instrument(
        name = "accounts::signup",
        skip(self, signup),
        fields(email = %signup.email)
    )]
    pub async fn signup(&self, signup: Signup) -> Result<UserId, AccountError> {
        validate_signup(&signup)?;

        let email = signup.email.trim().to_lowercase();
        let password_hash = hash_password(&signup.password)?;

        let user = NewUser {
            username: signup.username.trim().to_string(),
            email: email.clone(),
            password_hash,
        };

        match self.users.create_user(user).await {
            Ok(id) => {
                tracing::info!(user_id = %id, "user registered");
                Ok(id)
            }
            Err(StoreError::Constraint { .. }) => Err(AccountError::EmailTaken { email }),
            Err(e) => Err(AccountError::Store(e)),
        }
    }

    #[tracing::instrument(name = "accounts::login", skip(self, email, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AccountError> {
        let email = email.trim().to_lowercase();

        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        if !verify_password(&user.password_hash, password)? {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.signer.issue(user.id, Utc::now());
        tracing::info!(user_id = %user.id, "login successful");

        Ok(LoginOutcome {
            user_id: user.id,
            token,
        })
    }
}

fn validate_signup(signup: &Signup) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    if signup.username.trim().is_empty() {
        errors.push(FieldValidationError::new("username", "required"));
    }
    if !signup.email.trim().validate_email() {
        errors.push(FieldValidationError::new("email", "invalid email address"));
    }
    if signup.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldValidationError::new(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::from_fields(errors))
    }
}
