//! Secondary predicates: ordered domain checks run after the capability gate.
//!
//! Every failure here is reported to the caller as `NotFound`; the variants
//! of [`PredicateFailure`] only exist for diagnostics.

use std::fmt;

use tracing::debug;

use crate::collaborators::{EntityKey, EntityKind, EntityRef};
use crate::errors::CollaboratorError;
use crate::pipeline::EvaluationContext;
use crate::schema::ValidatedParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRelation {
    Learner,
    Facilitator,
}

/// Query parameters the exploration player derives its lookup from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorationLookup {
    pub exploration_param: String,
    pub version_param: String,
    pub collection_param: String,
    pub parent_param: String,
}

impl ExplorationLookup {
    pub fn standard() -> Self {
        Self {
            exploration_param: "exploration_id".to_string(),
            version_param: "v".to_string(),
            collection_param: "collection_id".to_string(),
            parent_param: "parent".to_string(),
        }
    }

    /// The collection scope to check. Whenever `parent` is present the
    /// collection parameter is ignored, whatever its value.
    pub fn effective_collection_id<'p>(&self, params: &'p ValidatedParams) -> Option<&'p str> {
        if params.has_query(&self.parent_param) {
            return None;
        }
        params.query_str(&self.collection_param)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryPredicate {
    /// The referenced entity exists. Makes it available to later predicates.
    Exists(EntityRef),
    /// The entity established earlier is published, or the principal holds
    /// `role`, or (when `owners_allowed`) owns it.
    PublishedOrPrivileged {
        kind: EntityKind,
        role: String,
        owners_allowed: bool,
    },
    /// At least one entity of the kind is published. Always passes in dev mode.
    AnyPublished(EntityKind),
    FeatureEnabled(String),
    /// The principal is a learner in, or facilitator of, the group
    /// established earlier.
    Membership {
        kind: EntityKind,
        relation: GroupRelation,
    },
    /// The entity established earlier (a user profile) holds `role` itself.
    TargetHoldsRole {
        kind: EntityKind,
        role: String,
    },
    /// Exploration, optional version and optional collection scope all exist.
    ExplorationExists(ExplorationLookup),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateFailure {
    Absent(EntityKind),
    VersionAbsent { kind: EntityKind, version: i64 },
    Unpublished(EntityKind),
    NonePublished(EntityKind),
    FeatureDisabled(String),
    NotMember(EntityKind),
    NotFacilitator(EntityKind),
    MissingTargetRole { kind: EntityKind, role: String },
}

impl fmt::Display for PredicateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateFailure::Absent(kind) => write!(f, "{} does not exist", kind),
            PredicateFailure::VersionAbsent { kind, version } => {
                write!(f, "{} has no version {}", kind, version)
            }
            PredicateFailure::Unpublished(kind) => write!(f, "{} is not published", kind),
            PredicateFailure::NonePublished(kind) => write!(f, "no {} is published", kind),
            PredicateFailure::FeatureDisabled(flag) => write!(f, "feature {} is disabled", flag),
            PredicateFailure::NotMember(kind) => write!(f, "principal is not a member of the {}", kind),
            PredicateFailure::NotFacilitator(kind) => {
                write!(f, "principal is not a facilitator of the {}", kind)
            }
            PredicateFailure::MissingTargetRole { kind, role } => {
                write!(f, "{} does not hold role {}", kind, role)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateOutcome {
    Pass,
    Fail(PredicateFailure),
}

impl SecondaryPredicate {
    pub fn exists(entity: EntityRef) -> Self {
        Self::Exists(entity)
    }

    pub fn published_or_privileged(kind: EntityKind, role: impl Into<String>) -> Self {
        Self::PublishedOrPrivileged {
            kind,
            role: role.into(),
            owners_allowed: false,
        }
    }

    pub fn published_or_owned(kind: EntityKind, role: impl Into<String>) -> Self {
        Self::PublishedOrPrivileged {
            kind,
            role: role.into(),
            owners_allowed: true,
        }
    }

    pub fn feature_enabled(flag: impl Into<String>) -> Self {
        Self::FeatureEnabled(flag.into())
    }

    pub fn member_of(kind: EntityKind) -> Self {
        Self::Membership {
            kind,
            relation: GroupRelation::Learner,
        }
    }

    pub fn facilitator_of(kind: EntityKind) -> Self {
        Self::Membership {
            kind,
            relation: GroupRelation::Facilitator,
        }
    }

    pub fn target_holds_role(kind: EntityKind, role: impl Into<String>) -> Self {
        Self::TargetHoldsRole {
            kind,
            role: role.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Exists(_) => "exists",
            Self::PublishedOrPrivileged { .. } => "published_or_privileged",
            Self::AnyPublished(_) => "any_published",
            Self::FeatureEnabled(_) => "feature_enabled",
            Self::Membership { .. } => "membership",
            Self::TargetHoldsRole { .. } => "target_holds_role",
            Self::ExplorationExists(_) => "exploration_exists",
        }
    }

    /// Entity kind that an earlier predicate must have established.
    pub fn requires(&self) -> Option<EntityKind> {
        match self {
            Self::PublishedOrPrivileged { kind, .. }
            | Self::Membership { kind, .. }
            | Self::TargetHoldsRole { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Entity kind this predicate establishes when it passes.
    pub fn provides(&self) -> Option<EntityKind> {
        match self {
            Self::Exists(entity) => Some(entity.kind),
            Self::ExplorationExists(_) => Some(EntityKind::Exploration),
            _ => None,
        }
    }

    /// Path and query parameters this predicate reads.
    pub fn referenced_params(&self) -> (Vec<&str>, Vec<&str>) {
        match self {
            Self::Exists(entity) => (entity.params.iter().map(String::as_str).collect(), Vec::new()),
            Self::ExplorationExists(lookup) => (
                vec![lookup.exploration_param.as_str()],
                vec![
                    lookup.version_param.as_str(),
                    lookup.collection_param.as_str(),
                    lookup.parent_param.as_str(),
                ],
            ),
            _ => (Vec::new(), Vec::new()),
        }
    }

    pub async fn check(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<PredicateOutcome, CollaboratorError> {
        use PredicateOutcome::{Fail, Pass};

        let outcome = match self {
            Self::Exists(entity) => {
                let found = match entity.key(ctx.params) {
                    Some(key) => ctx.lookup(entity.kind, &key).await?,
                    None => None,
                };
                match found {
                    Some(found) => {
                        ctx.remember(found);
                        Pass
                    }
                    None => Fail(PredicateFailure::Absent(entity.kind)),
                }
            }
            Self::PublishedOrPrivileged {
                kind,
                role,
                owners_allowed,
            } => {
                let Some(entity) = ctx.resolved(*kind) else {
                    return Ok(Fail(PredicateFailure::Absent(*kind)));
                };
                if ctx.is_published(entity).await? || ctx.has_role(role).await? {
                    Pass
                } else if *owners_allowed
                    && let Some(principal_id) = ctx.principal.id()
                    && ctx.is_owner(principal_id, entity).await?
                {
                    Pass
                } else {
                    Fail(PredicateFailure::Unpublished(*kind))
                }
            }
            Self::AnyPublished(kind) => {
                if ctx.config().dev_mode {
                    Pass
                } else {
                    let mut any = false;
                    for entity in ctx.list(*kind).await? {
                        if ctx.is_published(&entity).await? {
                            any = true;
                            break;
                        }
                    }
                    if any {
                        Pass
                    } else {
                        Fail(PredicateFailure::NonePublished(*kind))
                    }
                }
            }
            Self::FeatureEnabled(flag) => {
                if ctx.feature_enabled(flag).await? {
                    Pass
                } else {
                    Fail(PredicateFailure::FeatureDisabled(flag.clone()))
                }
            }
            Self::Membership { kind, relation } => {
                let Some(group) = ctx.resolved(*kind) else {
                    return Ok(Fail(PredicateFailure::Absent(*kind)));
                };
                match relation {
                    GroupRelation::Learner => {
                        if ctx.is_member(&group.id).await? {
                            Pass
                        } else {
                            Fail(PredicateFailure::NotMember(*kind))
                        }
                    }
                    GroupRelation::Facilitator => {
                        if ctx.is_facilitator(&group.id).await? {
                            Pass
                        } else {
                            Fail(PredicateFailure::NotFacilitator(*kind))
                        }
                    }
                }
            }
            Self::TargetHoldsRole { kind, role } => {
                let Some(target) = ctx.resolved(*kind) else {
                    return Ok(Fail(PredicateFailure::Absent(*kind)));
                };
                if ctx.entity_has_role(target, role).await? {
                    Pass
                } else {
                    Fail(PredicateFailure::MissingTargetRole {
                        kind: *kind,
                        role: role.clone(),
                    })
                }
            }
            Self::ExplorationExists(lookup) => Self::exploration_exists(lookup, ctx).await?,
        };

        debug!(predicate = self.name(), outcome = ?outcome, "Predicate evaluated");
        Ok(outcome)
    }

    async fn exploration_exists(
        lookup: &ExplorationLookup,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<PredicateOutcome, CollaboratorError> {
        let absent = PredicateOutcome::Fail(PredicateFailure::Absent(EntityKind::Exploration));
        let Some(exploration_id) = ctx.params.path_str(&lookup.exploration_param) else {
            return Ok(absent);
        };
        let Some(exploration) = ctx
            .lookup(EntityKind::Exploration, &EntityKey::id(exploration_id))
            .await?
        else {
            return Ok(absent);
        };

        if let Some(version) = ctx.params.query_int(&lookup.version_param)
            && !exploration.has_version(version)
        {
            return Ok(PredicateOutcome::Fail(PredicateFailure::VersionAbsent {
                kind: EntityKind::Exploration,
                version,
            }));
        }

        if let Some(collection_id) = lookup.effective_collection_id(ctx.params) {
            let collection = ctx
                .lookup(EntityKind::Collection, &EntityKey::id(collection_id))
                .await?;
            if collection.is_none() {
                return Ok(PredicateOutcome::Fail(PredicateFailure::Absent(
                    EntityKind::Collection,
                )));
            }
        }

        ctx.remember(exploration);
        Ok(PredicateOutcome::Pass)
    }
}

/// Run predicates in order, stopping at the first failure.
pub async fn run_chain(
    predicates: &[SecondaryPredicate],
    ctx: &mut EvaluationContext<'_>,
) -> Result<PredicateOutcome, CollaboratorError> {
    for predicate in predicates {
        if let failed @ PredicateOutcome::Fail(_) = predicate.check(ctx).await? {
            return Ok(failed);
        }
    }
    Ok(PredicateOutcome::Pass)
}
