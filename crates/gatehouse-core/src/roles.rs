//! Role and feature-flag name constants.
//!
//! Route declarations and tests use these instead of string literals so a
//! rename only has to happen here.
//!
//! # Example
//!
//! ```ignore
//! use gatehouse_core::roles;
//!
//! let requirement = CapabilityRequirement::RequiresRole(roles::RELEASE_COORDINATOR.into());
//! ```

// =============================================================================
// Roles
// =============================================================================

/// Any registered, logged-in learner or creator
pub const FULL_USER: &str = "full_user";
/// May view and edit unpublished curriculum (classrooms, topics, skills, stories)
pub const CURRICULUM_ADMIN: &str = "curriculum_admin";
/// Manages one or more topics and the stories inside them
pub const TOPIC_MANAGER: &str = "topic_manager";
/// Edits collections owned by anyone
pub const COLLECTION_EDITOR: &str = "collection_editor";
/// Owns platform release tooling
pub const RELEASE_COORDINATOR: &str = "release_coordinator";
/// Held by users allowed to publish blog posts (checked on the profile owner)
pub const BLOG_POST_AUTHOR: &str = "blog_post_author";

// =============================================================================
// Feature flags
// =============================================================================

/// Learner groups (facilitator dashboard, group pages)
pub const LEARNER_GROUPS: &str = "learner_groups_are_enabled";
/// Diagnostic test player
pub const DIAGNOSTIC_TEST: &str = "diagnostic_test";
