use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use gatehouse_auth::principal_from_token;
use gatehouse_core::{AppError, Principal};

use crate::state::AppState;

/// Extractor yielding the request's principal.
///
/// A request without an `Authorization` header is anonymous. A header that is
/// present but does not carry a valid bearer token is rejected with 401
/// rather than silently treated as anonymous.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl FromRequestParts<AppState> for CurrentPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(CurrentPrincipal(Principal::anonymous()));
        };

        let auth_header = auth_header
            .to_str()
            .map_err(|_| AppError::unauthorized(anyhow::anyhow!("Invalid authorization header")))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthorized(anyhow::anyhow!("Invalid authorization header format"))
        })?;

        let principal = principal_from_token(token, &state.jwt_config)?;

        Ok(CurrentPrincipal(principal))
    }
}
