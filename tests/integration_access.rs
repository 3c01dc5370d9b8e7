mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{
    LEARNER_GROUP_ID, STORY_ID, bearer, check, principals, seeded_directory, setup_test_app,
};
use gatehouse_config::PipelineConfig;
use gatehouse_core::roles;
use gatehouse_core::{Entity, EntityKind};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

fn app() -> axum::Router {
    setup_test_app(seeded_directory(), PipelineConfig::default())
}

#[tokio::test]
async fn test_health() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_published_classroom_is_open() {
    let (status, body) = check(&app(), "/learn/algebra", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_unpublished_classroom_looks_absent() {
    let app = app();
    let (unpublished_status, unpublished_body) = check(&app, "/learn/geometry", None).await;
    let (absent_status, absent_body) = check(&app, "/learn/calculus", None).await;

    assert_eq!(unpublished_status, StatusCode::NOT_FOUND);
    assert_eq!(absent_status, StatusCode::NOT_FOUND);
    assert_eq!(unpublished_body, absent_body);

    let admin = bearer("uid_admin", &[roles::FULL_USER, roles::CURRICULUM_ADMIN]);
    let (status, _) = check(&app, "/learn/geometry", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_classroom_fragment_is_validated() {
    let (status, body) = check(&app(), "/learn/Algebra_1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "classroom_url_fragment");
    assert_eq!(body["fields"][0]["location"], "path");
}

#[tokio::test]
async fn test_classroom_index_depends_on_any_published() {
    let (status, _) = check(&app(), "/learn", None).await;
    assert_eq!(status, StatusCode::OK);

    let empty = std::sync::Arc::new(gatehouse_core::InMemoryDirectory::new());
    let (status, _) = check(
        &setup_test_app(empty.clone(), PipelineConfig::default()),
        "/learn",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let dev = setup_test_app(empty, PipelineConfig::default().with_dev_mode(true));
    let (status, _) = check(&dev, "/learn", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_topic_pages() {
    let app = app();
    for page in [
        "/learn/algebra/fractions",
        "/learn/algebra/fractions/revision/intro",
        "/learn/algebra/fractions/review-test/pizza-party",
    ] {
        let (status, _) = check(&app, page, None).await;
        assert_eq!(status, StatusCode::OK, "{page}");
    }

    let (status, _) = check(&app, "/learn/algebra/hidden-topic", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = check(&app, "/learn/algebra/fractions/revision/outro", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_learner_group_id_format() {
    let learner = bearer(principals::LEARNER, &[roles::FULL_USER]);
    let (status, body) = check(
        &app(),
        "/learner_group/view/bad%20id!",
        Some(&learner),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "learner_group_id");
    assert_eq!(body["fields"][0]["code"], "pattern_mismatch");
}

#[tokio::test]
async fn test_learner_group_view() {
    let app = app();
    let page = format!("/learner_group/view/{}", LEARNER_GROUP_ID);

    let (status, _) = check(&app, &page, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let learner = bearer(principals::LEARNER, &[roles::FULL_USER]);
    let (status, _) = check(&app, &page, Some(&learner)).await;
    assert_eq!(status, StatusCode::OK);

    let outsider = bearer(principals::OUTSIDER, &[roles::FULL_USER]);
    let (status, _) = check(&app, &page, Some(&outsider)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = check(&app, "/learner_group/view/zzzzzzzzzzzz", Some(&learner)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_learner_group_edit_requires_facilitator() {
    let app = app();
    let page = format!("/learner_group/edit/{}", LEARNER_GROUP_ID);

    let facilitator = bearer(principals::FACILITATOR, &[roles::FULL_USER]);
    let (status, _) = check(&app, &page, Some(&facilitator)).await;
    assert_eq!(status, StatusCode::OK);

    let learner = bearer(principals::LEARNER, &[roles::FULL_USER]);
    let (status, _) = check(&app, &page, Some(&learner)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_disabled_feature_looks_absent() {
    let app = app();
    // Member of the group, but the feature is not enabled for them.
    let directory = seeded_directory();
    directory.add_learner(LEARNER_GROUP_ID, "uid_no_flag");
    let app_without_flag = setup_test_app(directory, PipelineConfig::default());
    let token = bearer("uid_no_flag", &[roles::FULL_USER]);

    for page in [
        "/facilitator-dashboard".to_string(),
        "/learner_group/create".to_string(),
        format!("/learner_group/view/{}", LEARNER_GROUP_ID),
    ] {
        let (status, _) = check(&app_without_flag, &page, Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{page}");
    }

    let (status, _) = check(&app, "/diagnostic-test-player", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_exploration_player_derived_collection() {
    let app = app();

    let (status, _) = check(&app, "/explore/exp_1?collection_id=missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (with_parent, _) = check(&app, "/explore/exp_1?parent=x&collection_id=missing", None).await;
    let (parent_only, _) = check(&app, "/explore/exp_1?parent=x", None).await;
    assert_eq!(with_parent, StatusCode::OK);
    assert_eq!(with_parent, parent_only);

    let (status, _) = check(&app, "/explore/exp_1?collection_id=col_1&v=3&iframed=true", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_exploration_player_query_validation() {
    let app = app();

    let (status, _) = check(&app, "/explore/exp_1?v=9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = check(&app, "/explore/exp_1?v=0&iframed=yes&debug=1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields.len(), 3);
    for field in ["v", "iframed", "debug"] {
        assert!(fields.contains(&field), "{field} missing from {fields:?}");
    }
}

#[tokio::test]
async fn test_unversioned_exploration_has_only_first_version() {
    let directory = seeded_directory();
    directory.put_entity(Entity::new(EntityKind::Exploration, "exp_new").published());
    let app = setup_test_app(directory, PipelineConfig::default());

    let (status, _) = check(&app, "/explore/exp_new?v=1", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = check(&app, "/explore/exp_new?v=2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_private_exploration_is_visible_to_owner() {
    let app = app();
    let (status, _) = check(&app, "/explore/exp_private", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let owner = bearer(principals::OWNER, &[roles::FULL_USER]);
    let (status, _) = check(&app, "/explore/exp_private", Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = check(&app, "/create/exp_private", Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_story_editor_conceals_denials() {
    let app = app();
    let page = format!("/story_editor/{}", STORY_ID);

    let (status, _) = check(&app, &page, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let outsider = bearer(principals::OUTSIDER, &[roles::FULL_USER]);
    let (status, _) = check(&app, &page, Some(&outsider)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let author = bearer(principals::AUTHOR, &[roles::FULL_USER]);
    let (status, _) = check(&app, &page, Some(&author)).await;
    assert_eq!(status, StatusCode::OK);

    let admin = bearer("uid_admin", &[roles::CURRICULUM_ADMIN]);
    let (status, _) = check(&app, &page, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = check(&app, "/story_editor/story_zzzzzz", Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = check(&app, "/story_editor/short", Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_collection_editor() {
    let app = app();
    let owner = bearer(principals::OWNER, &[roles::FULL_USER]);
    let (status, _) = check(&app, "/collection_editor/create/col_private", Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);

    let outsider = bearer(principals::OUTSIDER, &[roles::FULL_USER]);
    let (status, _) = check(&app, "/collection_editor/create/col_private", Some(&outsider)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = check(&app, "/collection/col_private", Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = check(&app, "/collection/col_private", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_private_collection_player_needs_admin_not_editor() {
    let app = app();

    let editor = bearer("uid_editor", &[roles::FULL_USER, roles::COLLECTION_EDITOR]);
    let (status, _) = check(&app, "/collection/col_private", Some(&editor)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = check(&app, "/collection_editor/create/col_private", Some(&editor)).await;
    assert_eq!(status, StatusCode::OK);

    let admin = bearer("uid_admin", &[roles::FULL_USER, roles::CURRICULUM_ADMIN]);
    let (status, _) = check(&app, "/collection/col_private", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_role_gated_pages_disclose() {
    let app = app();

    let (status, body) = check(&app, "/release-coordinator", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "You must be logged in to access this page");

    let user = bearer("uid_1", &[roles::FULL_USER]);
    let (status, _) = check(&app, "/release-coordinator", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = check(&app, "/topic_editor/topic_1", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let coordinator = bearer("uid_2", &[roles::RELEASE_COORDINATOR]);
    let (status, _) = check(&app, "/release-coordinator", Some(&coordinator)).await;
    assert_eq!(status, StatusCode::OK);

    let manager = bearer("uid_3", &[roles::TOPIC_MANAGER]);
    let (status, _) = check(&app, "/topic_editor/topic_1", Some(&manager)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = check(&app, "/skill_editor/skill_1", Some(&manager)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = check(&app, "/skill_editor/skill_9", Some(&manager)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_preferences_requires_full_user() {
    let app = app();
    let (status, _) = check(&app, "/preferences", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let no_roles = bearer("uid_norole", &[]);
    let (status, _) = check(&app, "/preferences", Some(&no_roles)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let user = bearer("uid_1", &[roles::FULL_USER]);
    let (status, _) = check(&app, "/preferences", Some(&user)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_encoded_slash_stays_in_its_segment() {
    let app = app();

    let (status, body) = check(&app, "/learn/algebra%2Ffractions", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "classroom_url_fragment");

    // A blog post fragment, not the author profile of "writer".
    let (status, _) = check(&app, "/blog/author%2Fwriter", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = check(&app, "/learn/alg%65bra", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_profiles_and_blog() {
    let app = app();

    for (page, expected) in [
        ("/profile/writer", StatusCode::OK),
        ("/profile/nobody", StatusCode::NOT_FOUND),
        ("/blog", StatusCode::OK),
        ("/blog/hello-world", StatusCode::OK),
        ("/blog/goodbye-world", StatusCode::NOT_FOUND),
        ("/blog/author/writer", StatusCode::OK),
        ("/blog/author/reader", StatusCode::NOT_FOUND),
        ("/blog/author/nobody", StatusCode::NOT_FOUND),
    ] {
        let (status, _) = check(&app, page, None).await;
        assert_eq!(status, expected, "{page}");
    }

    let long_name = "a".repeat(36);
    let (status, _) = check(&app, &format!("/blog/author/{}", long_name), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let app = app();
    let (status, _) = check(&app, "/learn/algebra", Some("Bearer not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = check(&app, "/learn/algebra", Some("Basic dXNlcjpwYXNz")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unmatched_page_is_not_found() {
    let (status, body) = check(&app(), "/no/such/page", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Could not find the page requested");
}

#[tokio::test]
async fn test_collaborator_outage_fails_closed() {
    let directory = seeded_directory();
    directory.set_available(false);
    let app = setup_test_app(directory, PipelineConfig::default());

    let (status, body) = check(&app, "/learn/algebra", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));

    // Open pages without predicates never consult the directory.
    let (status, _) = check(&app, "/blog", None).await;
    assert_eq!(status, StatusCode::OK);
}
