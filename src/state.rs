use std::fs;
use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use gatehouse_config::{CorsConfig, JwtConfig, PipelineConfig, ServerConfig};
use gatehouse_core::{AccessPipeline, Collaborators, InMemoryDirectory};

use crate::modules::access::build_registry;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: AccessPipeline,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State over an explicit collaborator set; used by `init_app_state` and tests.
    pub fn new(
        collaborators: Collaborators,
        pipeline_config: PipelineConfig,
        jwt_config: JwtConfig,
        cors_config: CorsConfig,
    ) -> anyhow::Result<Self> {
        let registry = build_registry().context("Failed to build route registry")?;
        info!(routes = registry.len(), "Route registry built");

        Ok(Self {
            pipeline: AccessPipeline::new(registry, collaborators, pipeline_config),
            jwt_config,
            cors_config,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn load_directory(server_config: &ServerConfig) -> anyhow::Result<InMemoryDirectory> {
    let Some(path) = &server_config.directory_seed else {
        info!("No directory seed configured, starting with an empty directory");
        return Ok(InMemoryDirectory::new());
    };

    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read directory seed {}", path.display()))?;
    let directory = InMemoryDirectory::from_json(&json)
        .with_context(|| format!("Failed to parse directory seed {}", path.display()))?;
    info!(path = %path.display(), "Directory seed loaded");

    Ok(directory)
}

pub fn init_app_state(server_config: &ServerConfig) -> anyhow::Result<AppState> {
    let directory = Arc::new(load_directory(server_config)?);

    AppState::new(
        Collaborators::from_shared(directory),
        PipelineConfig::from_env(),
        JwtConfig::from_env(),
        CorsConfig::from_env(),
    )
}
