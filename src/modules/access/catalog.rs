//! The access-validated pages, declared as data.
//!
//! Each page is one [`RouteSpec`]: its parameter schema, its capability
//! requirement and its ordered predicate chain. Adding a page means adding an
//! entry here, not a handler.

use gatehouse_core::roles;
use gatehouse_core::{
    CapabilityRequirement, EntityKind, EntityRef, ExplorationLookup, FieldSchema,
    RegistrationError, RouteRegistry, RouteSpec, SecondaryPredicate,
};
use regex::Regex;

/// Ids of explorations, collections, skills and topics.
pub const ENTITY_ID_REGEX: &str = "^[a-zA-Z0-9_-]{1,12}$";
pub const LEARNER_GROUP_ID_REGEX: &str = "^[a-zA-Z]{12}$";
pub const VALID_URL_FRAGMENT_REGEX: &str = "^[a-z]+(-[a-z]+)*$";

pub const MAX_CHARS_IN_CLASSROOM_URL_FRAGMENT: u64 = 20;
pub const MAX_CHARS_IN_TOPIC_URL_FRAGMENT: u64 = 20;
pub const MAX_CHARS_IN_SUBTOPIC_URL_FRAGMENT: u64 = 25;
pub const MAX_CHARS_IN_STORY_URL_FRAGMENT: u64 = 30;
pub const STORY_ID_LENGTH: u64 = 12;
pub const MAX_AUTHOR_NAME_LENGTH: u64 = 35;

struct Patterns {
    entity_id: Regex,
    learner_group_id: Regex,
    url_fragment: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, RegistrationError> {
        Ok(Self {
            entity_id: Regex::new(ENTITY_ID_REGEX)?,
            learner_group_id: Regex::new(LEARNER_GROUP_ID_REGEX)?,
            url_fragment: Regex::new(VALID_URL_FRAGMENT_REGEX)?,
        })
    }

    fn entity_id(&self, name: &str) -> FieldSchema {
        FieldSchema::string(name).matching(self.entity_id.clone())
    }

    fn learner_group_id(&self) -> FieldSchema {
        FieldSchema::string("learner_group_id").matching(self.learner_group_id.clone())
    }

    fn url_fragment(&self, name: &str, max: u64) -> FieldSchema {
        FieldSchema::string(name)
            .matching(self.url_fragment.clone())
            .max_length(max)
    }

    fn classroom_fragment(&self) -> FieldSchema {
        self.url_fragment("classroom_url_fragment", MAX_CHARS_IN_CLASSROOM_URL_FRAGMENT)
    }

    fn topic_fragment(&self) -> FieldSchema {
        self.url_fragment("topic_url_fragment", MAX_CHARS_IN_TOPIC_URL_FRAGMENT)
    }
}

fn published_topic() -> [SecondaryPredicate; 2] {
    [
        SecondaryPredicate::exists(EntityRef::by_url_fragment(
            EntityKind::Topic,
            "topic_url_fragment",
        )),
        SecondaryPredicate::published_or_privileged(EntityKind::Topic, roles::CURRICULUM_ADMIN),
    ]
}

/// Every access-validated page.
pub fn routes() -> Result<Vec<RouteSpec>, RegistrationError> {
    let p = Patterns::compile()?;
    let [topic_exists, topic_published] = published_topic();

    let learner_groups = |name: &str, pattern: &str| {
        RouteSpec::builder(name, pattern)
            .capability(CapabilityRequirement::requires_role(roles::FULL_USER))
            .predicate(SecondaryPredicate::feature_enabled(roles::LEARNER_GROUPS))
    };
    let learner_group_id = EntityRef::by_id(EntityKind::LearnerGroup, "learner_group_id");

    Ok(vec![
        // Learner-facing curriculum pages.
        RouteSpec::builder("classroom", "/learn/{classroom_url_fragment}")
            .path_field(p.classroom_fragment())
            .predicate(SecondaryPredicate::exists(EntityRef::by_url_fragment(
                EntityKind::Classroom,
                "classroom_url_fragment",
            )))
            .predicate(SecondaryPredicate::published_or_privileged(
                EntityKind::Classroom,
                roles::CURRICULUM_ADMIN,
            ))
            .build()?,
        RouteSpec::builder("classrooms", "/learn")
            .predicate(SecondaryPredicate::AnyPublished(EntityKind::Classroom))
            .build()?,
        RouteSpec::builder("topic_viewer", "/learn/{classroom_url_fragment}/{topic_url_fragment}")
            .path_field(p.classroom_fragment())
            .path_field(p.topic_fragment())
            .predicate(topic_exists.clone())
            .predicate(topic_published.clone())
            .build()?,
        RouteSpec::builder(
            "subtopic_viewer",
            "/learn/{classroom_url_fragment}/{topic_url_fragment}/revision/{subtopic_url_fragment}",
        )
        .path_field(p.classroom_fragment())
        .path_field(p.topic_fragment())
        .path_field(p.url_fragment(
            "subtopic_url_fragment",
            MAX_CHARS_IN_SUBTOPIC_URL_FRAGMENT,
        ))
        .predicate(topic_exists.clone())
        .predicate(topic_published.clone())
        .predicate(SecondaryPredicate::exists(
            EntityRef::by_url_fragment(EntityKind::Subtopic, "subtopic_url_fragment")
                .within("topic_url_fragment"),
        ))
        .build()?,
        RouteSpec::builder(
            "review_tests",
            "/learn/{classroom_url_fragment}/{topic_url_fragment}/review-test/{story_url_fragment}",
        )
        .path_field(p.classroom_fragment())
        .path_field(p.topic_fragment())
        .path_field(p.url_fragment("story_url_fragment", MAX_CHARS_IN_STORY_URL_FRAGMENT))
        .predicate(topic_exists)
        .predicate(topic_published)
        .predicate(SecondaryPredicate::exists(
            EntityRef::by_url_fragment(EntityKind::Story, "story_url_fragment")
                .within("topic_url_fragment"),
        ))
        .predicate(SecondaryPredicate::published_or_privileged(
            EntityKind::Story,
            roles::CURRICULUM_ADMIN,
        ))
        .build()?,
        // Players.
        RouteSpec::builder("collection_player", "/collection/{collection_id}")
            .path_field(FieldSchema::string("collection_id"))
            .predicate(SecondaryPredicate::exists(EntityRef::by_id(
                EntityKind::Collection,
                "collection_id",
            )))
            .predicate(SecondaryPredicate::published_or_owned(
                EntityKind::Collection,
                roles::CURRICULUM_ADMIN,
            ))
            .build()?,
        RouteSpec::builder("exploration_player", "/explore/{exploration_id}")
            .path_field(p.entity_id("exploration_id"))
            .query_field(FieldSchema::int("v").at_least(1).optional())
            .query_field(FieldSchema::string("parent").optional())
            .query_field(FieldSchema::boolean("iframed").optional())
            .query_field(p.entity_id("collection_id").optional())
            .predicate(SecondaryPredicate::ExplorationExists(ExplorationLookup::standard()))
            .predicate(SecondaryPredicate::published_or_owned(
                EntityKind::Exploration,
                roles::CURRICULUM_ADMIN,
            ))
            .build()?,
        RouteSpec::builder("diagnostic_test_player", "/diagnostic-test-player")
            .predicate(SecondaryPredicate::feature_enabled(roles::DIAGNOSTIC_TEST))
            .build()?,
        // Editors.
        RouteSpec::builder("exploration_editor", "/create/{exploration_id}")
            .path_field(p.entity_id("exploration_id"))
            .predicate(SecondaryPredicate::exists(EntityRef::by_id(
                EntityKind::Exploration,
                "exploration_id",
            )))
            .predicate(SecondaryPredicate::published_or_owned(
                EntityKind::Exploration,
                roles::CURRICULUM_ADMIN,
            ))
            .build()?,
        RouteSpec::builder("collection_editor", "/collection_editor/create/{collection_id}")
            .path_field(FieldSchema::string("collection_id"))
            .capability(CapabilityRequirement::ownership_or_role(
                EntityRef::by_id(EntityKind::Collection, "collection_id"),
                roles::COLLECTION_EDITOR,
            ))
            .predicate(SecondaryPredicate::exists(EntityRef::by_id(
                EntityKind::Collection,
                "collection_id",
            )))
            .conceal_denials()
            .build()?,
        RouteSpec::builder("topic_editor", "/topic_editor/{topic_id}")
            .path_field(p.entity_id("topic_id"))
            .capability(CapabilityRequirement::any_role([
                roles::CURRICULUM_ADMIN,
                roles::TOPIC_MANAGER,
            ]))
            .predicate(SecondaryPredicate::exists(EntityRef::by_id(
                EntityKind::Topic,
                "topic_id",
            )))
            .build()?,
        RouteSpec::builder("story_editor", "/story_editor/{story_id}")
            .path_field(FieldSchema::string("story_id").exact_length(STORY_ID_LENGTH))
            .capability(CapabilityRequirement::ownership_or_role(
                EntityRef::by_id(EntityKind::Story, "story_id"),
                roles::CURRICULUM_ADMIN,
            ))
            .predicate(SecondaryPredicate::exists(EntityRef::by_id(
                EntityKind::Story,
                "story_id",
            )))
            .conceal_denials()
            .build()?,
        RouteSpec::builder("skill_editor", "/skill_editor/{skill_id}")
            .path_field(p.entity_id("skill_id"))
            .capability(CapabilityRequirement::any_role([
                roles::CURRICULUM_ADMIN,
                roles::TOPIC_MANAGER,
            ]))
            .predicate(SecondaryPredicate::exists(EntityRef::by_id(
                EntityKind::Skill,
                "skill_id",
            )))
            .build()?,
        // Learner groups.
        learner_groups("facilitator_dashboard", "/facilitator-dashboard").build()?,
        learner_groups("learner_group_create", "/learner_group/create").build()?,
        learner_groups("learner_group_view", "/learner_group/view/{learner_group_id}")
            .path_field(p.learner_group_id())
            .predicate(SecondaryPredicate::exists(learner_group_id.clone()))
            .predicate(SecondaryPredicate::member_of(EntityKind::LearnerGroup))
            .build()?,
        learner_groups("learner_group_edit", "/learner_group/edit/{learner_group_id}")
            .path_field(p.learner_group_id())
            .predicate(SecondaryPredicate::exists(learner_group_id))
            .predicate(SecondaryPredicate::facilitator_of(EntityKind::LearnerGroup))
            .build()?,
        // Accounts and profiles.
        RouteSpec::builder("preferences", "/preferences")
            .capability(CapabilityRequirement::requires_role(roles::FULL_USER))
            .build()?,
        RouteSpec::builder("profile", "/profile/{username}")
            .path_field(FieldSchema::string("username"))
            .predicate(SecondaryPredicate::exists(EntityRef::by_username(
                EntityKind::UserProfile,
                "username",
            )))
            .build()?,
        RouteSpec::builder("release_coordinator", "/release-coordinator")
            .capability(CapabilityRequirement::requires_role(
                roles::RELEASE_COORDINATOR,
            ))
            .build()?,
        // Blog.
        RouteSpec::builder("blog_home", "/blog").build()?,
        RouteSpec::builder("blog_post", "/blog/{blog_post_url_fragment}")
            .path_field(FieldSchema::string("blog_post_url_fragment"))
            .predicate(SecondaryPredicate::exists(EntityRef::by_url_fragment(
                EntityKind::BlogPost,
                "blog_post_url_fragment",
            )))
            .build()?,
        RouteSpec::builder("blog_author_profile", "/blog/author/{author_username}")
            .path_field(FieldSchema::string("author_username").max_length(MAX_AUTHOR_NAME_LENGTH))
            .predicate(SecondaryPredicate::exists(EntityRef::by_username(
                EntityKind::UserProfile,
                "author_username",
            )))
            .predicate(SecondaryPredicate::target_holds_role(
                EntityKind::UserProfile,
                roles::BLOG_POST_AUTHOR,
            ))
            .build()?,
    ])
}

/// Register every page. Fails on the first misdeclared route.
pub fn build_registry() -> Result<RouteRegistry, RegistrationError> {
    let mut registry = RouteRegistry::new();
    for route in routes()? {
        registry.register(route)?;
    }
    Ok(registry)
}
