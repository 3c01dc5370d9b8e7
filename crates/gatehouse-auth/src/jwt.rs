//! JWT (JSON Web Token) utilities.
//!
//! Verification is all the service needs at runtime; token creation exists for
//! tests and local tooling that must produce tokens the service accepts.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use gatehouse_config::JwtConfig;
use gatehouse_core::{AppError, Principal};

use crate::claims::Claims;

/// Creates an access token carrying the principal's roles.
///
/// # Errors
///
/// Returns an internal error if token encoding fails.
pub fn create_access_token(
    principal_id: &str,
    roles: Vec<String>,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + jwt_config.access_token_expiry as usize;

    let claims = Claims {
        sub: principal_id.to_string(),
        roles,
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to create token: {}", e)))
}

/// Verifies an access token and returns the embedded claims.
///
/// # Errors
///
/// Returns an unauthorized error if the signature is invalid, the token has
/// expired or the token is malformed.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized(anyhow::anyhow!("Invalid or expired token")))
}

/// Verify `token` and build the principal it identifies.
pub fn principal_from_token(token: &str, jwt_config: &JwtConfig) -> Result<Principal, AppError> {
    verify_token(token, jwt_config).map(Claims::into_principal)
}
