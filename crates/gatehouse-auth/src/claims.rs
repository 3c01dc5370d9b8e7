//! JWT claim structure for access tokens.

use gatehouse_core::Principal;
use serde::{Deserialize, Serialize};

/// JWT claims for access tokens.
///
/// - `sub`: principal id (subject)
/// - `roles`: role names held by the principal
/// - `exp`: token expiration timestamp
/// - `iat`: token issued-at timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id (subject claim)
    pub sub: String,
    /// Role names granted to the principal
    #[serde(default)]
    pub roles: Vec<String>,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: usize,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: usize,
}

impl Claims {
    pub fn into_principal(self) -> Principal {
        Principal::identified(self.sub, self.roles)
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        claims.into_principal()
    }
}
