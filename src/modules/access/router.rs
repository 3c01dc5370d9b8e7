use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::validate_access;

pub fn init_access_router() -> Router<AppState> {
    Router::new().route("/{*path}", get(validate_access))
}
