//! # Gatehouse Config
//!
//! Configuration types for the Gatehouse access-validation service.
//!
//! Every structure is loaded from environment variables with `from_env()` and
//! falls back to a `Default` suitable for local development and tests:
//!
//! - [`pipeline`]: access pipeline policy (dev mode, collaborator timeout)
//! - [`jwt`]: bearer token verification settings
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`server`]: listen address and collaborator seed data
//!
//! # Example
//!
//! ```ignore
//! use gatehouse_config::{CorsConfig, JwtConfig, PipelineConfig, ServerConfig};
//!
//! let pipeline_config = PipelineConfig::from_env();
//! let jwt_config = JwtConfig::from_env();
//! let cors_config = CorsConfig::from_env();
//! let server_config = ServerConfig::from_env();
//! ```

pub mod cors;
pub mod jwt;
pub mod pipeline;
pub mod server;

// Re-export commonly used types at crate root
pub use cors::CorsConfig;
pub use jwt::JwtConfig;
pub use pipeline::PipelineConfig;
pub use server::ServerConfig;

/// Parse a boolean-ish environment value (`true`/`1`/`yes`, case-insensitive).
pub(crate) fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
