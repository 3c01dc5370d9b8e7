use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, extract::State, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::modules::access::init_access_router;
use crate::modules::access::model::HealthResponse;
use crate::state::AppState;

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn init_router(state: AppState) -> Router {
    let allowed_origins: Vec<HeaderValue> = state
        .cors_config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .nest("/access_validation_handler", init_access_router())
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}
