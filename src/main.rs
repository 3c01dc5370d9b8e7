use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;

use gatehouse::gatehouse_config::ServerConfig;
use gatehouse::logging::init_tracing;
use gatehouse::metrics::init_metrics;
use gatehouse::router::init_router;
use gatehouse::state::init_app_state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let server_config = ServerConfig::from_env();

    let mut state = init_app_state(&server_config)?;
    if let Some(handle) = init_metrics()? {
        state = state.with_metrics(handle);
    }
    let app = init_router(state);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", server_config.bind_address))?;
    info!(address = %server_config.bind_address, "Server running");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
