//! Bearer token authentication
//!
//! Tokens are HS256 JWTs carrying the user's id and a single staff role.
//! Issuing tokens belongs to the identity service; [`create_token`] exists
//! for tooling and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use core_kernel::{Principal, Role, UserId};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Staff role, e.g. `doctor` or `pharmacist`
    pub role: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    /// Resolves the claims into the caller of an operation
    pub fn principal(&self) -> Result<Principal, AuthError> {
        let id = Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidSubject(self.sub.clone()))?;
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| AuthError::UnknownRole(self.role.clone()))?;
        Ok(Principal::new(UserId::from(id), role))
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token subject: {0}")]
    InvalidSubject(String),
    #[error("Unknown role: {0}")]
    UnknownRole(String),
    #[error("Token could not be signed")]
    Signing,
}

/// Creates a signed token for `user_id` acting as `role`
pub fn create_token(
    user_id: UserId,
    role: Role,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(i64::from(u32::try_from(expiration_secs).unwrap_or(u32::MAX)));

    let claims = Claims {
        sub: user_id.as_uuid().to_string(),
        role: role.as_str().to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::Signing)
}

/// Validates a token's signature and expiry
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Validates a token and resolves its principal
pub fn authenticate(token: &str, secret: &str) -> Result<Principal, AuthError> {
    validate_token(token, secret)?.principal()
}
