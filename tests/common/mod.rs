use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use gatehouse::state::AppState;
use gatehouse::router::init_router;
use gatehouse_auth::create_access_token;
use gatehouse_config::{CorsConfig, JwtConfig, PipelineConfig};
use gatehouse_core::roles;
use gatehouse_core::{Collaborators, Entity, EntityKey, EntityKind, InMemoryDirectory};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Well-known principals seeded into the test directory
#[allow(dead_code)]
pub mod principals {
    pub const OWNER: &str = "uid_owner";
    pub const AUTHOR: &str = "uid_author";
    pub const LEARNER: &str = "uid_learner";
    pub const FACILITATOR: &str = "uid_facilitator";
    pub const OUTSIDER: &str = "uid_outsider";
}

pub const LEARNER_GROUP_ID: &str = "abcdefghijkl";
pub const STORY_ID: &str = "story_abc123";

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test_secret_key_for_testing_purposes".to_string(),
        access_token_expiry: 3600,
    }
}

/// A directory with one of everything, published and unpublished.
pub fn seeded_directory() -> Arc<InMemoryDirectory> {
    let directory = InMemoryDirectory::new();

    let algebra = Entity::new(EntityKind::Classroom, "classroom_1").published();
    directory.put_entity_at(EntityKey::url_fragment("algebra"), algebra.clone());
    directory.put_entity(algebra);
    let geometry = Entity::new(EntityKind::Classroom, "classroom_2");
    directory.put_entity_at(EntityKey::url_fragment("geometry"), geometry.clone());
    directory.put_entity(geometry);

    let fractions = Entity::new(EntityKind::Topic, "topic_1").published();
    directory.put_entity_at(EntityKey::url_fragment("fractions"), fractions.clone());
    directory.put_entity(fractions);
    directory.put_entity_at(
        EntityKey::url_fragment("hidden-topic"),
        Entity::new(EntityKind::Topic, "topic_2"),
    );
    directory.put_entity_at(
        EntityKey::url_fragment("fractions/intro"),
        Entity::new(EntityKind::Subtopic, "topic_1-1").published(),
    );

    let story = Entity::new(EntityKind::Story, STORY_ID)
        .published()
        .owned_by(principals::AUTHOR);
    directory.put_entity_at(EntityKey::url_fragment("fractions/pizza-party"), story.clone());
    directory.put_entity(story);

    directory.put_entity(Entity::new(EntityKind::Collection, "col_1").published());
    directory.put_entity(Entity::new(EntityKind::Collection, "col_private").owned_by(principals::OWNER));

    directory.put_entity(
        Entity::new(EntityKind::Exploration, "exp_1")
            .published()
            .with_latest_version(3),
    );
    directory.put_entity(
        Entity::new(EntityKind::Exploration, "exp_private")
            .owned_by(principals::OWNER)
            .with_latest_version(1),
    );

    directory.put_entity(Entity::new(EntityKind::Skill, "skill_1"));
    directory.put_entity_at(
        EntityKey::url_fragment("hello-world"),
        Entity::new(EntityKind::BlogPost, "blog_1").published(),
    );

    directory.put_entity_at(
        EntityKey::username("writer"),
        Entity::new(EntityKind::UserProfile, "uid_writer").with_role(roles::BLOG_POST_AUTHOR),
    );
    directory.put_entity_at(
        EntityKey::username("reader"),
        Entity::new(EntityKind::UserProfile, "uid_reader"),
    );

    directory.put_entity(Entity::new(EntityKind::LearnerGroup, LEARNER_GROUP_ID));
    directory.add_learner(LEARNER_GROUP_ID, principals::LEARNER);
    directory.add_facilitator(LEARNER_GROUP_ID, principals::FACILITATOR);
    for principal in [
        principals::LEARNER,
        principals::FACILITATOR,
        principals::OUTSIDER,
    ] {
        directory.enable_feature_for(roles::LEARNER_GROUPS, principal);
    }

    Arc::new(directory)
}

pub fn setup_test_app(directory: Arc<InMemoryDirectory>, config: PipelineConfig) -> axum::Router {
    let state = AppState::new(
        Collaborators::from_shared(directory),
        config,
        test_jwt_config(),
        CorsConfig::default(),
    )
    .unwrap();
    init_router(state)
}

/// Bearer token for a principal holding `roles`.
pub fn bearer(principal_id: &str, roles: &[&str]) -> String {
    let token = create_access_token(
        principal_id,
        roles.iter().map(|r| r.to_string()).collect(),
        &test_jwt_config(),
    )
    .unwrap();
    format!("Bearer {}", token)
}

/// GET an access-validation path, returning the status and JSON body.
pub async fn check(
    app: &axum::Router,
    page: &str,
    authorization: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder()
        .method("GET")
        .uri(format!("/access_validation_handler{}", page));
    if let Some(value) = authorization {
        request = request.header(header::AUTHORIZATION, value);
    }

    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, body)
}
