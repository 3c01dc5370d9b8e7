use axum::{
    Json,
    extract::{Query, State},
    http::Uri,
};
use tracing::instrument;

use gatehouse_core::AppError;

use crate::middleware::principal::CurrentPrincipal;
use crate::modules::access::model::AccessGranted;
use crate::modules::access::service::AccessService;
use crate::state::AppState;

/// Answers `200 {}` when the page may be rendered, or the denial.
///
/// The page path is taken still percent-encoded; the registry splits it into
/// segments before decoding them.
#[instrument(skip(state, uri, query), fields(path = uri.path()))]
pub async fn validate_access(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<AccessGranted>, AppError> {
    AccessService::validate(&state.pipeline, uri.path(), query, &principal).await?;

    Ok(Json(AccessGranted::default()))
}
