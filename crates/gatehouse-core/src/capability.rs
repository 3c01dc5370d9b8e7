//! Capability gate: the route-level authorization requirement.
//!
//! A requirement is a value attached to the route and evaluated against the
//! principal and the validated path parameters. Composite requirements
//! short-circuit: `AllOf` stops at the first deny, `AnyOf` at the first allow.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::collaborators::{EntityKind, EntityRef};
use crate::errors::CollaboratorError;
use crate::pipeline::EvaluationContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityRequirement {
    OpenAccess,
    RequiresLogin,
    RequiresRole(String),
    /// Holders of `role` pass; anyone else must own the referenced entity.
    RequiresOwnershipOrRole {
        entity: EntityRef,
        role: String,
    },
    /// The flag is checked first, then `inner`.
    RequiresFeatureEnabled {
        flag: String,
        inner: Box<CapabilityRequirement>,
    },
    AllOf(Vec<CapabilityRequirement>),
    AnyOf(Vec<CapabilityRequirement>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityDenial {
    NotLoggedIn,
    MissingRole(String),
    NotOwner(EntityKind),
    FeatureDisabled(String),
    NoAlternatives,
}

impl fmt::Display for CapabilityDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityDenial::NotLoggedIn => write!(f, "principal is not logged in"),
            CapabilityDenial::MissingRole(role) => write!(f, "principal lacks role {}", role),
            CapabilityDenial::NotOwner(kind) => {
                write!(f, "principal does not own the {}", kind)
            }
            CapabilityDenial::FeatureDisabled(flag) => write!(f, "feature {} is disabled", flag),
            CapabilityDenial::NoAlternatives => write!(f, "no alternative requirement allowed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityOutcome {
    Allow,
    Deny(CapabilityDenial),
}

type CapabilityFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CapabilityOutcome, CollaboratorError>> + Send + 'a>>;

impl CapabilityRequirement {
    pub fn requires_role(role: impl Into<String>) -> Self {
        Self::RequiresRole(role.into())
    }

    pub fn any_role<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf(roles.into_iter().map(Self::requires_role).collect())
    }

    pub fn ownership_or_role(entity: EntityRef, role: impl Into<String>) -> Self {
        Self::RequiresOwnershipOrRole {
            entity,
            role: role.into(),
        }
    }

    pub fn feature_enabled(flag: impl Into<String>, inner: CapabilityRequirement) -> Self {
        Self::RequiresFeatureEnabled {
            flag: flag.into(),
            inner: Box::new(inner),
        }
    }

    /// Path parameters this requirement reads.
    pub fn referenced_params(&self) -> Vec<&str> {
        match self {
            Self::OpenAccess | Self::RequiresLogin | Self::RequiresRole(_) => Vec::new(),
            Self::RequiresOwnershipOrRole { entity, .. } => {
                entity.params.iter().map(String::as_str).collect()
            }
            Self::RequiresFeatureEnabled { inner, .. } => inner.referenced_params(),
            Self::AllOf(reqs) | Self::AnyOf(reqs) => {
                reqs.iter().flat_map(|r| r.referenced_params()).collect()
            }
        }
    }

    pub fn evaluate<'a>(&'a self, ctx: &'a EvaluationContext<'a>) -> CapabilityFuture<'a> {
        Box::pin(async move {
            let outcome = match self {
                Self::OpenAccess => CapabilityOutcome::Allow,
                Self::RequiresLogin => {
                    if ctx.principal.is_anonymous() {
                        CapabilityOutcome::Deny(CapabilityDenial::NotLoggedIn)
                    } else {
                        CapabilityOutcome::Allow
                    }
                }
                Self::RequiresRole(role) => {
                    if ctx.principal.is_anonymous() {
                        CapabilityOutcome::Deny(CapabilityDenial::NotLoggedIn)
                    } else if ctx.has_role(role).await? {
                        CapabilityOutcome::Allow
                    } else {
                        CapabilityOutcome::Deny(CapabilityDenial::MissingRole(role.clone()))
                    }
                }
                Self::RequiresOwnershipOrRole { entity, role } => {
                    Self::ownership_or_role_outcome(ctx, entity, role).await?
                }
                Self::RequiresFeatureEnabled { flag, inner } => {
                    if ctx.feature_enabled(flag).await? {
                        inner.evaluate(ctx).await?
                    } else {
                        CapabilityOutcome::Deny(CapabilityDenial::FeatureDisabled(flag.clone()))
                    }
                }
                Self::AllOf(reqs) => {
                    let mut outcome = CapabilityOutcome::Allow;
                    for req in reqs {
                        if let deny @ CapabilityOutcome::Deny(_) = req.evaluate(ctx).await? {
                            outcome = deny;
                            break;
                        }
                    }
                    outcome
                }
                Self::AnyOf(reqs) => {
                    let mut first_denial = None;
                    let mut allowed = false;
                    for req in reqs {
                        match req.evaluate(ctx).await? {
                            CapabilityOutcome::Allow => {
                                allowed = true;
                                break;
                            }
                            CapabilityOutcome::Deny(denial) => {
                                first_denial.get_or_insert(denial);
                            }
                        }
                    }
                    if allowed {
                        CapabilityOutcome::Allow
                    } else {
                        CapabilityOutcome::Deny(
                            first_denial.unwrap_or(CapabilityDenial::NoAlternatives),
                        )
                    }
                }
            };

            debug!(requirement = ?self, outcome = ?outcome, "Capability evaluated");
            Ok(outcome)
        })
    }

    async fn ownership_or_role_outcome(
        ctx: &EvaluationContext<'_>,
        entity: &EntityRef,
        role: &str,
    ) -> Result<CapabilityOutcome, CollaboratorError> {
        let Some(principal_id) = ctx.principal.id() else {
            return Ok(CapabilityOutcome::Deny(CapabilityDenial::NotLoggedIn));
        };

        if ctx.has_role(role).await? {
            return Ok(CapabilityOutcome::Allow);
        }

        let not_owner = CapabilityOutcome::Deny(CapabilityDenial::NotOwner(entity.kind));
        let Some(key) = entity.key(ctx.params) else {
            return Ok(not_owner);
        };
        let Some(found) = ctx.lookup(entity.kind, &key).await? else {
            return Ok(not_owner);
        };

        if ctx.is_owner(principal_id, &found).await? {
            Ok(CapabilityOutcome::Allow)
        } else {
            Ok(not_owner)
        }
    }
}
