use std::env;
use std::path::PathBuf;

/// Process-level settings for the HTTP service.
///
/// # Environment Variables
///
/// - `SERVER_ADDR`: socket address to bind (default: `0.0.0.0:3000`)
/// - `DIRECTORY_SEED_PATH`: optional JSON file with collaborator seed data
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub directory_seed: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            bind_address: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            directory_seed: env::var("DIRECTORY_SEED_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            directory_seed: None,
        }
    }
}
