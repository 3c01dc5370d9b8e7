//! # Gatehouse Core
//!
//! The access-validation pipeline that runs before a page is rendered.
//!
//! A request is evaluated in fixed stages, each stopping at its first failure:
//!
//! - [`schema`]: validates and coerces raw path and query parameters
//! - [`capability`]: the route-level authorization requirement
//! - [`predicate`]: ordered domain checks (existence, publication, flags, membership)
//! - [`verdict`]: maps the first failure to what the caller may learn
//! - [`registry`]: binds URL patterns to the stages above
//!
//! Supporting modules:
//!
//! - [`collaborators`]: read-only services the stages consult
//! - [`memory`]: an in-memory implementation of those services
//! - [`pipeline`]: per-request evaluation and the composed [`AccessPipeline`]
//! - [`errors`]: collaborator, registration and HTTP error types
//!
//! # Example
//!
//! ```ignore
//! use gatehouse_core::{AccessPipeline, Collaborators, Principal, RawParams};
//!
//! let pipeline = AccessPipeline::new(registry, Collaborators::from_shared(directory), config);
//! let resolved = pipeline.resolve("/learn/algebra").expect("page is registered");
//! let raw = RawParams::new(resolved.path_params, vec![]);
//! let decision = pipeline
//!     .evaluate(resolved.route, &Principal::anonymous(), &raw)
//!     .await?;
//! assert!(decision.verdict.is_allowed());
//! ```

pub mod capability;
pub mod collaborators;
pub mod errors;
pub mod memory;
pub mod pipeline;
pub mod predicate;
pub mod principal;
pub mod registry;
pub mod roles;
pub mod schema;
pub mod verdict;

// Re-export commonly used types at crate root
pub use capability::{CapabilityDenial, CapabilityOutcome, CapabilityRequirement};
pub use collaborators::{
    Collaborators, Entity, EntityKey, EntityKind, EntityRef, EntityStore, FeatureFlags,
    GroupDirectory, KeyField, RoleDirectory,
};
pub use errors::{AppError, CollaboratorError, RegistrationError};
pub use memory::{DirectorySeed, InMemoryDirectory};
pub use pipeline::{AccessPipeline, EvaluationContext};
pub use predicate::{
    ExplorationLookup, GroupRelation, PredicateFailure, PredicateOutcome, SecondaryPredicate,
};
pub use principal::Principal;
pub use registry::{ResolvedRoute, RouteRegistry, RouteSpec, RouteSpecBuilder};
pub use schema::{FieldSchema, FieldViolation, RawParams, Schema, ValidatedParams, Value};
pub use verdict::{Decision, DenialPolicy, DenialReason, ExternalErrorKind, Verdict};
