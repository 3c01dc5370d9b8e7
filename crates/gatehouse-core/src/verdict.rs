//! Mapping internal failures to what the caller is allowed to learn.
//!
//! Several internal reasons (absent entity, unpublished entity, disabled
//! feature, missing membership, failed ownership on a sensitive route) map to
//! the same `NotFound` so a caller cannot probe for hidden resources. The
//! internal reason is kept on the [`Decision`] for logging only.

use std::fmt;

use serde::Serialize;

use crate::capability::CapabilityDenial;
use crate::predicate::PredicateFailure;
use crate::schema::FieldViolation;

/// Failure kinds visible outside the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum ExternalErrorKind {
    BadInput(Vec<FieldViolation>),
    Unauthenticated,
    Unauthorized,
    NotFound,
}

impl ExternalErrorKind {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ExternalErrorKind::BadInput(_) => "bad_input",
            ExternalErrorKind::Unauthenticated => "unauthenticated",
            ExternalErrorKind::Unauthorized => "unauthorized",
            ExternalErrorKind::NotFound => "not_found",
        }
    }
}

/// Terminal outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied(ExternalErrorKind),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Allowed => "allowed",
            Verdict::Denied(kind) => kind.label(),
        }
    }
}

/// How a route reports capability denials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DenialPolicy {
    /// The route and its requirement are not secret: 401 for anonymous
    /// principals, 403 otherwise.
    #[default]
    Disclose,
    /// Denials concern a specific resource; report them as absent.
    Conceal,
}

/// Why a request was denied. Never sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    InvalidInput,
    Capability(CapabilityDenial),
    Predicate(PredicateFailure),
    UnknownRoute,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::InvalidInput => write!(f, "invalid input"),
            DenialReason::Capability(denial) => write!(f, "capability denied: {}", denial),
            DenialReason::Predicate(failure) => write!(f, "predicate failed: {}", failure),
            DenialReason::UnknownRoute => write!(f, "no route matches"),
        }
    }
}

/// The verdict plus the internal reason behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: Option<DenialReason>,
}

impl Decision {
    pub fn allowed() -> Self {
        Self {
            verdict: Verdict::Allowed,
            reason: None,
        }
    }

    pub fn bad_input(fields: Vec<FieldViolation>) -> Self {
        Self {
            verdict: Verdict::Denied(ExternalErrorKind::BadInput(fields)),
            reason: Some(DenialReason::InvalidInput),
        }
    }

    pub fn capability_denied(denial: CapabilityDenial, policy: DenialPolicy) -> Self {
        Self {
            verdict: Verdict::Denied(map_capability_denial(&denial, policy)),
            reason: Some(DenialReason::Capability(denial)),
        }
    }

    pub fn predicate_failed(failure: PredicateFailure) -> Self {
        Self {
            verdict: Verdict::Denied(ExternalErrorKind::NotFound),
            reason: Some(DenialReason::Predicate(failure)),
        }
    }

    pub fn unknown_route() -> Self {
        Self {
            verdict: Verdict::Denied(ExternalErrorKind::NotFound),
            reason: Some(DenialReason::UnknownRoute),
        }
    }
}

/// A disabled feature always looks like a missing page, whatever the policy.
pub fn map_capability_denial(denial: &CapabilityDenial, policy: DenialPolicy) -> ExternalErrorKind {
    match (denial, policy) {
        (CapabilityDenial::FeatureDisabled(_), _) => ExternalErrorKind::NotFound,
        (_, DenialPolicy::Conceal) => ExternalErrorKind::NotFound,
        (CapabilityDenial::NotLoggedIn, DenialPolicy::Disclose) => {
            ExternalErrorKind::Unauthenticated
        }
        (_, DenialPolicy::Disclose) => ExternalErrorKind::Unauthorized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::EntityKind;

    #[test]
    fn test_disclosed_denials() {
        assert_eq!(
            map_capability_denial(&CapabilityDenial::NotLoggedIn, DenialPolicy::Disclose),
            ExternalErrorKind::Unauthenticated
        );
        assert_eq!(
            map_capability_denial(
                &CapabilityDenial::MissingRole("release_coordinator".into()),
                DenialPolicy::Disclose
            ),
            ExternalErrorKind::Unauthorized
        );
    }

    #[test]
    fn test_concealed_denials_look_absent() {
        for denial in [
            CapabilityDenial::NotLoggedIn,
            CapabilityDenial::MissingRole("curriculum_admin".into()),
            CapabilityDenial::NotOwner(EntityKind::Story),
        ] {
            assert_eq!(
                map_capability_denial(&denial, DenialPolicy::Conceal),
                ExternalErrorKind::NotFound
            );
        }
    }

    #[test]
    fn test_disabled_feature_is_never_forbidden() {
        let denial = CapabilityDenial::FeatureDisabled("diagnostic_test".into());
        assert_eq!(
            map_capability_denial(&denial, DenialPolicy::Disclose),
            ExternalErrorKind::NotFound
        );
    }

    #[test]
    fn test_every_predicate_failure_is_not_found() {
        for failure in [
            PredicateFailure::Absent(EntityKind::Classroom),
            PredicateFailure::Unpublished(EntityKind::Classroom),
            PredicateFailure::FeatureDisabled("learner_groups_are_enabled".into()),
            PredicateFailure::NotMember(EntityKind::LearnerGroup),
        ] {
            assert_eq!(
                Decision::predicate_failed(failure).verdict,
                Verdict::Denied(ExternalErrorKind::NotFound)
            );
        }
    }
}
