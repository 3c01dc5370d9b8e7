//! Access pipeline policy.
//!
//! These values are fixed at process start and handed to the pipeline when it
//! is constructed; nothing in the pipeline reads the environment itself.

use std::env;
use std::time::Duration;

use crate::parse_flag;

/// Policy knobs for the access-validation pipeline.
///
/// # Environment Variables
///
/// - `GATEHOUSE_DEV_MODE`: treat content listings as published (default: `false`)
/// - `COLLABORATOR_TIMEOUT_MS`: upper bound for a single collaborator call (default: `2000`)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Development deployments have no published content; listing pages
    /// that would otherwise 404 stay reachable.
    pub dev_mode: bool,

    /// Bound for each lookup/flag/membership call. Expiry fails the request.
    pub collaborator_timeout: Duration,
}

impl PipelineConfig {
    pub const DEFAULT_COLLABORATOR_TIMEOUT_MS: u64 = 2000;

    pub fn from_env() -> Self {
        Self {
            dev_mode: env::var("GATEHOUSE_DEV_MODE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            collaborator_timeout: Duration::from_millis(
                env::var("COLLABORATOR_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(Self::DEFAULT_COLLABORATOR_TIMEOUT_MS),
            ),
        }
    }

    /// Same policy with `dev_mode` replaced.
    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub fn with_collaborator_timeout(mut self, timeout: Duration) -> Self {
        self.collaborator_timeout = timeout;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dev_mode: false,
            collaborator_timeout: Duration::from_millis(Self::DEFAULT_COLLABORATOR_TIMEOUT_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_production_policy() {
        let config = PipelineConfig::default();
        assert!(!config.dev_mode);
        assert_eq!(config.collaborator_timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_builders() {
        let config = PipelineConfig::default()
            .with_dev_mode(true)
            .with_collaborator_timeout(Duration::from_millis(50));
        assert!(config.dev_mode);
        assert_eq!(config.collaborator_timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }
}
