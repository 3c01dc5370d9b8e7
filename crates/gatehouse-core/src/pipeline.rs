//! Per-request evaluation: schema, capability gate, predicate chain, verdict.

use std::collections::HashMap;
use std::sync::Arc;

use gatehouse_config::PipelineConfig;
use tracing::{debug, error, instrument, warn};

use crate::capability::CapabilityOutcome;
use crate::collaborators::{Collaborators, Entity, EntityKey, EntityKind, bounded};
use crate::errors::CollaboratorError;
use crate::predicate::{PredicateOutcome, run_chain};
use crate::principal::Principal;
use crate::registry::{ResolvedRoute, RouteRegistry, RouteSpec};
use crate::schema::{RawParams, ValidatedParams};
use crate::verdict::Decision;

const ENTITY_STORE: &str = "entity store";
const FEATURE_FLAGS: &str = "feature flags";
const GROUP_DIRECTORY: &str = "group directory";
const ROLE_DIRECTORY: &str = "role directory";

/// Everything a capability or predicate may consult for one request.
///
/// Collaborator calls go through the methods here so each one is bounded by
/// the configured timeout. Entities found by existence checks are kept for
/// the predicates that follow them.
pub struct EvaluationContext<'a> {
    pub principal: &'a Principal,
    pub params: &'a ValidatedParams,
    collaborators: &'a Collaborators,
    config: &'a PipelineConfig,
    resolved: HashMap<EntityKind, Entity>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        principal: &'a Principal,
        params: &'a ValidatedParams,
        collaborators: &'a Collaborators,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            principal,
            params,
            collaborators,
            config,
            resolved: HashMap::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        self.config
    }

    /// Entity established by an earlier existence check.
    pub fn resolved(&self, kind: EntityKind) -> Option<&Entity> {
        self.resolved.get(&kind)
    }

    pub(crate) fn remember(&mut self, entity: Entity) {
        self.resolved.insert(entity.kind, entity);
    }

    pub async fn lookup(
        &self,
        kind: EntityKind,
        key: &EntityKey,
    ) -> Result<Option<Entity>, CollaboratorError> {
        bounded(
            ENTITY_STORE,
            self.config.collaborator_timeout,
            self.collaborators.entities.lookup_entity(kind, key),
        )
        .await
    }

    pub async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, CollaboratorError> {
        bounded(
            ENTITY_STORE,
            self.config.collaborator_timeout,
            self.collaborators.entities.list_entities(kind),
        )
        .await
    }

    pub async fn is_published(&self, entity: &Entity) -> Result<bool, CollaboratorError> {
        bounded(
            ENTITY_STORE,
            self.config.collaborator_timeout,
            self.collaborators.entities.is_published(entity),
        )
        .await
    }

    pub async fn is_owner(
        &self,
        principal_id: &str,
        entity: &Entity,
    ) -> Result<bool, CollaboratorError> {
        bounded(
            ENTITY_STORE,
            self.config.collaborator_timeout,
            self.collaborators.entities.is_owner(principal_id, entity),
        )
        .await
    }

    pub async fn entity_has_role(
        &self,
        entity: &Entity,
        role: &str,
    ) -> Result<bool, CollaboratorError> {
        bounded(
            ENTITY_STORE,
            self.config.collaborator_timeout,
            self.collaborators.entities.entity_has_role(entity, role),
        )
        .await
    }

    pub async fn feature_enabled(&self, flag: &str) -> Result<bool, CollaboratorError> {
        bounded(
            FEATURE_FLAGS,
            self.config.collaborator_timeout,
            self.collaborators
                .flags
                .is_feature_enabled(flag, self.principal.id()),
        )
        .await
    }

    /// Anonymous principals belong to no group.
    pub async fn is_member(&self, group_id: &str) -> Result<bool, CollaboratorError> {
        let Some(principal_id) = self.principal.id() else {
            return Ok(false);
        };
        bounded(
            GROUP_DIRECTORY,
            self.config.collaborator_timeout,
            self.collaborators.groups.is_member(principal_id, group_id),
        )
        .await
    }

    pub async fn is_facilitator(&self, group_id: &str) -> Result<bool, CollaboratorError> {
        let Some(principal_id) = self.principal.id() else {
            return Ok(false);
        };
        bounded(
            GROUP_DIRECTORY,
            self.config.collaborator_timeout,
            self.collaborators
                .groups
                .is_facilitator(principal_id, group_id),
        )
        .await
    }

    pub async fn has_role(&self, role: &str) -> Result<bool, CollaboratorError> {
        if self.principal.is_anonymous() {
            return Ok(false);
        }
        bounded(
            ROLE_DIRECTORY,
            self.config.collaborator_timeout,
            self.collaborators.roles.has_role(self.principal, role),
        )
        .await
    }
}

/// The composed access-validation pipeline.
///
/// Holds the immutable route registry and the collaborator handles. Cheap to
/// clone and safe to share across concurrent requests.
#[derive(Debug, Clone)]
pub struct AccessPipeline {
    registry: Arc<RouteRegistry>,
    collaborators: Collaborators,
    config: PipelineConfig,
}

impl AccessPipeline {
    pub fn new(registry: RouteRegistry, collaborators: Collaborators, config: PipelineConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            collaborators,
            config,
        }
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn resolve<'r>(&'r self, path: &str) -> Option<ResolvedRoute<'r>> {
        self.registry.resolve(path)
    }

    /// Evaluate one request against a route.
    ///
    /// Stages run in order and the first failure is terminal. A collaborator
    /// failure aborts the evaluation; it is never turned into a verdict.
    #[instrument(skip_all, fields(route = %route.name(), principal = ?principal.id()))]
    pub async fn evaluate(
        &self,
        route: &RouteSpec,
        principal: &Principal,
        raw: &RawParams,
    ) -> Result<Decision, CollaboratorError> {
        let decision = match self.run_stages(route, principal, raw).await {
            Ok(decision) => decision,
            Err(err) => {
                error!(service = err.service(), error = %err, "Collaborator failed, denying request");
                return Err(err);
            }
        };

        if let Some(reason) = &decision.reason {
            warn!(
                outcome = decision.verdict.label(),
                reason = %reason,
                "Access denied"
            );
        } else {
            debug!("Access allowed");
        }

        Ok(decision)
    }

    async fn run_stages(
        &self,
        route: &RouteSpec,
        principal: &Principal,
        raw: &RawParams,
    ) -> Result<Decision, CollaboratorError> {
        let params = match route.schema().validate(raw) {
            Ok(params) => params,
            Err(fields) => return Ok(Decision::bad_input(fields)),
        };
        debug!("Parameters validated");

        let mut ctx = EvaluationContext::new(principal, &params, &self.collaborators, &self.config);

        if let CapabilityOutcome::Deny(denial) = route.capability().evaluate(&ctx).await? {
            return Ok(Decision::capability_denied(denial, route.denial_policy()));
        }

        match run_chain(route.predicates(), &mut ctx).await? {
            PredicateOutcome::Pass => Ok(Decision::allowed()),
            PredicateOutcome::Fail(failure) => Ok(Decision::predicate_failed(failure)),
        }
    }
}
