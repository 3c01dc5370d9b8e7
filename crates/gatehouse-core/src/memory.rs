//! In-memory collaborator implementation, seeded from JSON or built in code.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::Deserialize;

use crate::collaborators::{
    Entity, EntityKey, EntityKind, EntityStore, FeatureFlags, GroupDirectory, RoleDirectory,
};
use crate::errors::CollaboratorError;

#[derive(Debug, Default)]
struct State {
    entities: HashMap<(EntityKind, EntityKey), Entity>,
    enabled_flags: HashSet<String>,
    enabled_for: HashMap<String, HashSet<String>>,
    learners: HashMap<String, HashSet<String>>,
    facilitators: HashMap<String, HashSet<String>>,
    offline: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntity {
    #[serde(flatten)]
    pub entity: Entity,
    #[serde(default)]
    pub url_fragment: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFlags {
    #[serde(default)]
    pub enabled: Vec<String>,
    #[serde(default)]
    pub enabled_for: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedGroup {
    pub id: String,
    #[serde(default)]
    pub learners: Vec<String>,
    #[serde(default)]
    pub facilitators: Vec<String>,
}

/// Contents of a `DIRECTORY_SEED_PATH` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub entities: Vec<SeedEntity>,
    #[serde(default)]
    pub feature_flags: SeedFlags,
    #[serde(default)]
    pub learner_groups: Vec<SeedGroup>,
}

/// Serves every collaborator trait from process memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: DirectorySeed) -> Self {
        let directory = Self::new();
        for SeedEntity {
            entity,
            url_fragment,
            username,
        } in seed.entities
        {
            if let Some(fragment) = url_fragment {
                directory.put_entity_at(EntityKey::url_fragment(fragment), entity.clone());
            }
            if let Some(username) = username {
                directory.put_entity_at(EntityKey::username(username), entity.clone());
            }
            directory.put_entity(entity);
        }

        for flag in seed.feature_flags.enabled {
            directory.set_feature(&flag, true);
        }
        for (flag, principals) in seed.feature_flags.enabled_for {
            for principal_id in principals {
                directory.enable_feature_for(&flag, &principal_id);
            }
        }

        for group in seed.learner_groups {
            for learner in &group.learners {
                directory.add_learner(&group.id, learner);
            }
            for facilitator in &group.facilitators {
                directory.add_facilitator(&group.id, facilitator);
            }
        }
        directory
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let seed: DirectorySeed = serde_json::from_str(json)?;
        Ok(Self::from_seed(seed))
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn online(&self, service: &'static str) -> Result<RwLockReadGuard<'_, State>, CollaboratorError> {
        let state = self.read();
        if state.offline {
            return Err(CollaboratorError::unavailable(
                service,
                anyhow::anyhow!("in-memory directory is offline"),
            ));
        }
        Ok(state)
    }

    /// Store an entity under its id.
    pub fn put_entity(&self, entity: Entity) {
        self.put_entity_at(EntityKey::id(entity.id.clone()), entity);
    }

    /// Store an entity under an additional key (url fragment, username).
    pub fn put_entity_at(&self, key: EntityKey, entity: Entity) {
        self.write().entities.insert((entity.kind, key), entity);
    }

    pub fn set_feature(&self, flag: &str, enabled: bool) {
        let mut state = self.write();
        if enabled {
            state.enabled_flags.insert(flag.to_string());
        } else {
            state.enabled_flags.remove(flag);
        }
    }

    pub fn enable_feature_for(&self, flag: &str, principal_id: &str) {
        self.write()
            .enabled_for
            .entry(flag.to_string())
            .or_default()
            .insert(principal_id.to_string());
    }

    pub fn add_learner(&self, group_id: &str, principal_id: &str) {
        self.write()
            .learners
            .entry(group_id.to_string())
            .or_default()
            .insert(principal_id.to_string());
    }

    pub fn add_facilitator(&self, group_id: &str, principal_id: &str) {
        self.write()
            .facilitators
            .entry(group_id.to_string())
            .or_default()
            .insert(principal_id.to_string());
    }

    /// Simulate an outage: every lookup fails until switched back on.
    pub fn set_available(&self, available: bool) {
        self.write().offline = !available;
    }
}

#[async_trait]
impl EntityStore for InMemoryDirectory {
    async fn lookup_entity(
        &self,
        kind: EntityKind,
        key: &EntityKey,
    ) -> Result<Option<Entity>, CollaboratorError> {
        let state = self.online("entity store")?;
        Ok(state.entities.get(&(kind, key.clone())).cloned())
    }

    async fn list_entities(&self, kind: EntityKind) -> Result<Vec<Entity>, CollaboratorError> {
        let state = self.online("entity store")?;
        let mut seen = HashSet::new();
        let mut entities: Vec<Entity> = state
            .entities
            .iter()
            .filter(|((k, _), entity)| *k == kind && seen.insert(entity.id.clone()))
            .map(|(_, entity)| entity.clone())
            .collect();
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entities)
    }
}

#[async_trait]
impl FeatureFlags for InMemoryDirectory {
    async fn is_feature_enabled(
        &self,
        flag: &str,
        principal_id: Option<&str>,
    ) -> Result<bool, CollaboratorError> {
        let state = self.online("feature flags")?;
        if state.enabled_flags.contains(flag) {
            return Ok(true);
        }
        Ok(principal_id.is_some_and(|id| {
            state
                .enabled_for
                .get(flag)
                .is_some_and(|principals| principals.contains(id))
        }))
    }
}

#[async_trait]
impl GroupDirectory for InMemoryDirectory {
    async fn is_member(&self, principal_id: &str, group_id: &str) -> Result<bool, CollaboratorError> {
        let state = self.online("group directory")?;
        Ok(state
            .learners
            .get(group_id)
            .is_some_and(|members| members.contains(principal_id)))
    }

    async fn is_facilitator(
        &self,
        principal_id: &str,
        group_id: &str,
    ) -> Result<bool, CollaboratorError> {
        let state = self.online("group directory")?;
        Ok(state
            .facilitators
            .get(group_id)
            .is_some_and(|members| members.contains(principal_id)))
    }
}

#[async_trait]
impl RoleDirectory for InMemoryDirectory {}
