//! # Gatehouse Auth
//!
//! Turns a bearer token into the [`Principal`](gatehouse_core::Principal) the
//! access pipeline evaluates.
//!
//! - [`claims`]: JWT claim structure and its conversion into a principal
//! - [`jwt`]: token creation and verification utilities
//!
//! The pipeline itself never constructs principals; this crate is the
//! authentication collaborator that does.
//!
//! # Example
//!
//! ```ignore
//! use gatehouse_auth::{create_access_token, verify_token};
//! use gatehouse_config::JwtConfig;
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token("uid_42", vec!["full_user".to_string()], &config)?;
//!
//! let principal = verify_token(&token, &config)?.into_principal();
//! assert_eq!(principal.id(), Some("uid_42"));
//! ```

pub mod claims;
pub mod jwt;

// Re-export commonly used types at crate root
pub use claims::Claims;
pub use jwt::{create_access_token, principal_from_token, verify_token};
