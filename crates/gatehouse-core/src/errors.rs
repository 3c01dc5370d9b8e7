use std::time::Duration;

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::collaborators::EntityKind;
use crate::schema::FieldViolation;
use crate::verdict::ExternalErrorKind;

/// A read-only collaborator could not answer. The pipeline fails closed on it.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{service} is unavailable: {source}")]
    Unavailable {
        service: &'static str,
        #[source]
        source: Error,
    },

    #[error("{service} did not answer within {after:?}")]
    Timeout {
        service: &'static str,
        after: Duration,
    },
}

impl CollaboratorError {
    pub fn unavailable<E>(service: &'static str, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::Unavailable {
            service,
            source: err.into(),
        }
    }

    pub fn service(&self) -> &'static str {
        match self {
            Self::Unavailable { service, .. } | Self::Timeout { service, .. } => service,
        }
    }
}

/// A route declaration that can never evaluate correctly.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("route '{route}': invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        route: String,
        pattern: String,
        reason: String,
    },

    #[error("route '{route}': pattern '{pattern}' has the same shape as route '{existing}'")]
    DuplicatePattern {
        route: String,
        pattern: String,
        existing: String,
    },

    #[error("route name '{0}' is already registered")]
    DuplicateRoute(String),

    #[error("route '{route}': path parameter '{param}' has no matching schema field")]
    UndeclaredPathParam { route: String, param: String },

    #[error("route '{route}': schema path field '{field}' does not appear in the pattern")]
    UnboundPathField { route: String, field: String },

    #[error("route '{route}': field '{field}' is declared twice")]
    DuplicateField { route: String, field: String },

    #[error("route '{route}': path field '{field}' cannot be optional")]
    OptionalPathField { route: String, field: String },

    #[error("route '{route}': constraint {constraint} does not apply to field '{field}'")]
    ConstraintTypeMismatch {
        route: String,
        field: String,
        constraint: String,
    },

    #[error("route '{route}': default value of '{field}' has the wrong type")]
    DefaultTypeMismatch { route: String, field: String },

    #[error("route '{route}': {stage} references undeclared parameter '{param}'")]
    UnknownParameter {
        route: String,
        stage: String,
        param: String,
    },

    #[error("route '{route}': predicate {predicate} needs {kind:?} to be looked up by an earlier existence check")]
    PredicateOrder {
        route: String,
        predicate: String,
        kind: EntityKind,
    },

    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),
}

/// HTTP-facing error. Carries the disclosable field violations for 400s.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
    pub fields: Vec<FieldViolation>,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
            fields: Vec::new(),
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    pub fn unauthorized<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNAUTHORIZED, err)
    }

    pub fn forbidden<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::FORBIDDEN, err)
    }

    pub fn bad_input(fields: Vec<FieldViolation>) -> Self {
        let summary = fields
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            status: StatusCode::BAD_REQUEST,
            error: anyhow::anyhow!("Invalid request parameters: {}", summary),
            fields,
        }
    }
}

impl From<ExternalErrorKind> for AppError {
    fn from(kind: ExternalErrorKind) -> Self {
        match kind {
            ExternalErrorKind::BadInput(fields) => AppError::bad_input(fields),
            ExternalErrorKind::Unauthenticated => {
                AppError::unauthorized(anyhow::anyhow!("You must be logged in to access this page"))
            }
            ExternalErrorKind::Unauthorized => AppError::forbidden(anyhow::anyhow!(
                "You do not have the credentials to access this page"
            )),
            ExternalErrorKind::NotFound => {
                AppError::not_found(anyhow::anyhow!("Could not find the page requested"))
            }
        }
    }
}

impl From<CollaboratorError> for AppError {
    // The detail stays in the logs; callers get a generic server error.
    fn from(_: CollaboratorError) -> Self {
        AppError::internal(anyhow::anyhow!("Internal server error"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = if self.fields.is_empty() {
            json!({ "error": self.error.to_string() })
        } else {
            json!({ "error": self.error.to_string(), "fields": self.fields })
        };

        (self.status, Json(body)).into_response()
    }
}
