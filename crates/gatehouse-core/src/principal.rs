//! The acting identity of a request.

use std::collections::BTreeSet;
use std::fmt;

/// Who is making the request.
///
/// Built by the authentication layer before the pipeline runs and never
/// modified afterwards.
#[derive(Clone, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    Identified { id: String, roles: BTreeSet<String> },
}

impl Principal {
    pub fn anonymous() -> Self {
        Principal::Anonymous
    }

    pub fn identified<I, S>(id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Principal::Identified {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Principal::Anonymous => None,
            Principal::Identified { id, .. } => Some(id),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    /// Role membership as carried by the principal itself.
    pub fn holds_role(&self, role: &str) -> bool {
        match self {
            Principal::Anonymous => false,
            Principal::Identified { roles, .. } => roles.contains(role),
        }
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Anonymous => write!(f, "Anonymous"),
            Principal::Identified { id, roles } => f
                .debug_struct("Identified")
                .field("id", id)
                .field("roles", roles)
                .finish(),
        }
    }
}
