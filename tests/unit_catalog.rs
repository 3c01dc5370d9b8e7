use std::collections::HashSet;

use gatehouse::modules::access::catalog::{build_registry, routes};
use gatehouse_core::roles;
use gatehouse_core::{CapabilityRequirement, DenialPolicy};

#[test]
fn test_catalog_registers_every_page() {
    let registry = build_registry().unwrap();
    assert_eq!(registry.len(), 23);

    let names: HashSet<&str> = registry.routes().map(|r| r.name()).collect();
    assert_eq!(names.len(), registry.len());
}

#[test]
fn test_route_names_are_unique_in_declaration() {
    let routes = routes().unwrap();
    let mut seen = HashSet::new();
    for route in &routes {
        assert!(seen.insert(route.name().to_string()), "{}", route.name());
    }
}

#[test]
fn test_resolve_by_path() {
    let registry = build_registry().unwrap();

    let cases = [
        ("/learn", "classrooms"),
        ("/learn/algebra", "classroom"),
        ("/learn/algebra/fractions", "topic_viewer"),
        ("/learn/algebra/fractions/revision/intro", "subtopic_viewer"),
        ("/learn/algebra/fractions/review-test/pizza", "review_tests"),
        ("/explore/exp_1", "exploration_player"),
        ("/create/exp_1", "exploration_editor"),
        ("/collection/col_1", "collection_player"),
        ("/collection_editor/create/col_1", "collection_editor"),
        ("/learner_group/create", "learner_group_create"),
        ("/learner_group/view/abcdefghijkl", "learner_group_view"),
        ("/blog", "blog_home"),
        ("/blog/hello-world", "blog_post"),
        ("/blog/author/writer", "blog_author_profile"),
    ];
    for (path, expected) in cases {
        let resolved = registry.resolve(path).unwrap();
        assert_eq!(resolved.route.name(), expected, "{path}");
    }

    assert!(registry.resolve("/learn/a/b/c").is_none());
    assert!(registry.resolve("/admin").is_none());
}

#[test]
fn test_resolve_captures_path_params() {
    let registry = build_registry().unwrap();
    let resolved = registry
        .resolve("/learn/algebra/fractions/revision/intro")
        .unwrap();

    assert_eq!(
        resolved.path_params,
        vec![
            ("classroom_url_fragment".to_string(), "algebra".to_string()),
            ("topic_url_fragment".to_string(), "fractions".to_string()),
            ("subtopic_url_fragment".to_string(), "intro".to_string()),
        ]
    );
}

#[test]
fn test_resource_editors_conceal_denials() {
    let registry = build_registry().unwrap();

    for name in ["collection_editor", "story_editor"] {
        let route = registry.get(name).unwrap();
        assert_eq!(route.denial_policy(), DenialPolicy::Conceal, "{name}");
    }
    for name in ["topic_editor", "skill_editor", "release_coordinator"] {
        let route = registry.get(name).unwrap();
        assert_eq!(route.denial_policy(), DenialPolicy::Disclose, "{name}");
    }
}

#[test]
fn test_open_pages_have_no_capability() {
    let registry = build_registry().unwrap();

    for name in ["blog_home", "classroom", "exploration_player"] {
        let route = registry.get(name).unwrap();
        assert_eq!(route.capability(), &CapabilityRequirement::OpenAccess, "{name}");
    }
    assert!(registry.get("blog_home").unwrap().predicates().is_empty());
}

#[test]
fn test_account_pages_require_full_user() {
    let registry = build_registry().unwrap();
    let preferences = registry.get("preferences").unwrap();
    assert_eq!(
        preferences.capability(),
        &CapabilityRequirement::requires_role(roles::FULL_USER)
    );
}

#[test]
fn test_resolve_keeps_encoded_slash_in_segment() {
    let registry = build_registry().unwrap();

    let resolved = registry.resolve("/blog/author%2Fwriter").unwrap();
    assert_eq!(resolved.route.name(), "blog_post");
    assert_eq!(
        resolved.path_params,
        vec![(
            "blog_post_url_fragment".to_string(),
            "author/writer".to_string()
        )]
    );
}
