//! Read-only services the pipeline consults.
//!
//! Entity storage, feature flags, group membership and role assignment live
//! elsewhere; the pipeline only asks questions through these traits. None of
//! them is ever asked to change anything.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::CollaboratorError;
use crate::principal::Principal;
use crate::schema::ValidatedParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Classroom,
    Topic,
    Subtopic,
    Story,
    Skill,
    Collection,
    Exploration,
    BlogPost,
    UserProfile,
    LearnerGroup,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Classroom => "classroom",
            EntityKind::Topic => "topic",
            EntityKind::Subtopic => "subtopic",
            EntityKind::Story => "story",
            EntityKind::Skill => "skill",
            EntityKind::Collection => "collection",
            EntityKind::Exploration => "exploration",
            EntityKind::BlogPost => "blog_post",
            EntityKind::UserProfile => "user_profile",
            EntityKind::LearnerGroup => "learner_group",
        };
        write!(f, "{}", name)
    }
}

/// Which attribute a lookup key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyField {
    Id,
    UrlFragment,
    Username,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub field: KeyField,
    pub value: String,
}

impl EntityKey {
    pub fn id(value: impl Into<String>) -> Self {
        Self {
            field: KeyField::Id,
            value: value.into(),
        }
    }

    pub fn url_fragment(value: impl Into<String>) -> Self {
        Self {
            field: KeyField::UrlFragment,
            value: value.into(),
        }
    }

    pub fn username(value: impl Into<String>) -> Self {
        Self {
            field: KeyField::Username,
            value: value.into(),
        }
    }
}

/// Names the path parameters identifying an entity on a given route.
///
/// Scoped entities (a subtopic inside a topic, a story inside a topic) are
/// keyed by their parameters joined with `/`, parent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub field: KeyField,
    pub params: Vec<String>,
}

impl EntityRef {
    fn new(kind: EntityKind, field: KeyField, param: impl Into<String>) -> Self {
        Self {
            kind,
            field,
            params: vec![param.into()],
        }
    }

    pub fn by_id(kind: EntityKind, param: impl Into<String>) -> Self {
        Self::new(kind, KeyField::Id, param)
    }

    pub fn by_url_fragment(kind: EntityKind, param: impl Into<String>) -> Self {
        Self::new(kind, KeyField::UrlFragment, param)
    }

    pub fn by_username(kind: EntityKind, param: impl Into<String>) -> Self {
        Self::new(kind, KeyField::Username, param)
    }

    /// Scope the key under another path parameter.
    pub fn within(mut self, parent_param: impl Into<String>) -> Self {
        self.params.insert(0, parent_param.into());
        self
    }

    /// Build the lookup key from validated path parameters.
    pub fn key(&self, params: &ValidatedParams) -> Option<EntityKey> {
        let parts = self
            .params
            .iter()
            .map(|p| params.path_str(p))
            .collect::<Option<Vec<_>>>()?;

        Some(EntityKey {
            field: self.field,
            value: parts.join("/"),
        })
    }
}

/// What a lookup returns: just enough to answer access questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub id: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub owners: BTreeSet<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub latest_version: Option<u32>,
}

impl Entity {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            published: false,
            owners: BTreeSet::new(),
            roles: BTreeSet::new(),
            latest_version: None,
        }
    }

    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }

    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owners.insert(owner.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_latest_version(mut self, version: u32) -> Self {
        self.latest_version = Some(version);
        self
    }

    /// Version `v` exists iff `1 <= v <= latest_version`. An entity with no
    /// recorded version history only has its first version.
    pub fn has_version(&self, version: i64) -> bool {
        let latest = self.latest_version.unwrap_or(1);
        version >= 1 && version <= i64::from(latest)
    }
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn lookup_entity(
        &self,
        kind: EntityKind,
        key: &EntityKey,
    ) -> Result<Option<Entity>, CollaboratorError>;

    async fn list_entities(&self, kind: EntityKind) -> Result<Vec<Entity>, CollaboratorError>;

    async fn is_published(&self, entity: &Entity) -> Result<bool, CollaboratorError> {
        Ok(entity.published)
    }

    async fn is_owner(&self, principal_id: &str, entity: &Entity) -> Result<bool, CollaboratorError> {
        Ok(entity.owners.contains(principal_id))
    }

    /// Role held by the entity itself (a user profile), not by the requester.
    async fn entity_has_role(&self, entity: &Entity, role: &str) -> Result<bool, CollaboratorError> {
        Ok(entity.roles.contains(role))
    }
}

#[async_trait]
pub trait FeatureFlags: Send + Sync {
    async fn is_feature_enabled(
        &self,
        flag: &str,
        principal_id: Option<&str>,
    ) -> Result<bool, CollaboratorError>;
}

#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn is_member(&self, principal_id: &str, group_id: &str) -> Result<bool, CollaboratorError>;

    async fn is_facilitator(
        &self,
        principal_id: &str,
        group_id: &str,
    ) -> Result<bool, CollaboratorError>;
}

#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn has_role(&self, principal: &Principal, role: &str) -> Result<bool, CollaboratorError> {
        Ok(principal.holds_role(role))
    }
}

/// The collaborator handles a pipeline is constructed with.
#[derive(Clone)]
pub struct Collaborators {
    pub entities: Arc<dyn EntityStore>,
    pub flags: Arc<dyn FeatureFlags>,
    pub groups: Arc<dyn GroupDirectory>,
    pub roles: Arc<dyn RoleDirectory>,
}

impl Collaborators {
    /// One value serving every collaborator role.
    pub fn from_shared<T>(shared: Arc<T>) -> Self
    where
        T: EntityStore + FeatureFlags + GroupDirectory + RoleDirectory + 'static,
    {
        Self {
            entities: shared.clone(),
            flags: shared.clone(),
            groups: shared.clone(),
            roles: shared,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Bound a collaborator call by `timeout`. Expiry is reported, never retried.
pub(crate) async fn bounded<T, F>(
    service: &'static str,
    timeout: Duration,
    call: F,
) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout {
            service,
            after: timeout,
        }),
    }
}
