//! # Gatehouse
//!
//! An HTTP service that decides whether a page may be rendered for the
//! current requester, before any rendering happens.
//!
//! ## Overview
//!
//! Every access-validated page is a route in a data-driven catalog. A request
//! to `/access_validation_handler/<page path>` is resolved to its route and
//! evaluated by the pipeline in [`gatehouse_core`]:
//!
//! ```text
//! raw params ─▶ schema ─▶ capability gate ─▶ predicate chain ─▶ verdict
//!                 │              │                  │
//!                400        401 / 403 / 404        404
//! ```
//!
//! Predicate failures always answer 404, so a caller cannot tell an absent
//! page from an unpublished one, a disabled feature or a group it does not
//! belong to. Routes that guard a specific resource conceal capability
//! denials the same way.
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── middleware/       # Principal extractor
//! ├── modules/
//! │   └── access/      # Route catalog, controller, service, router
//! ├── logging.rs       # Subscriber setup and request logging
//! ├── metrics.rs       # Prometheus recorder and counters
//! ├── router.rs        # Main application router
//! └── state.rs         # Shared application state
//! ```
//!
//! ## Quick Start
//!
//! ### Environment Variables
//!
//! ```bash
//! SERVER_ADDR=0.0.0.0:3000
//! JWT_SECRET=your-secure-secret-key
//! DIRECTORY_SEED_PATH=./seed.json
//! GATEHOUSE_DEV_MODE=false
//! COLLABORATOR_TIMEOUT_MS=2000
//! LOG_FORMAT=json
//! ```
//!
//! ## Modules
//!
//! - [`logging`]: Tracing subscriber and request logging middleware
//! - [`metrics`]: Prometheus metrics
//! - [`middleware`]: Principal extraction
//! - [`modules`]: Feature modules (access validation)
//! - [`router`]: Main application router
//! - [`state`]: Shared application state

pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;

// Re-export workspace crates for convenience
pub use gatehouse_auth;
pub use gatehouse_config;
pub use gatehouse_core;
