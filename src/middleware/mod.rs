//! Request extractors.
//!
//! - [`principal`]: resolves the acting [`Principal`](gatehouse_core::Principal)
//!   from the `Authorization` header
//!
//! # Authentication Flow
//!
//! 1. No `Authorization` header: the request is anonymous
//! 2. `Authorization: Bearer <token>`: the JWT is verified and its claims
//!    become an identified principal
//! 3. Anything else: the request is rejected with 401 before the pipeline runs
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::principal::CurrentPrincipal;
//!
//! async fn handler(CurrentPrincipal(principal): CurrentPrincipal) -> impl IntoResponse {
//!     // principal is Anonymous or Identified
//! }
//! ```

pub mod principal;
