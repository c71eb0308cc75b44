//! Configuration for flake enrichment.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Sippy API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://sippy.dptools.openshift.org/api";

/// Flake enrichment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlakeConfig {
    /// Enable the flake stage; when disabled the stage passes its input through
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Corpus API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Release to query; derived from the cluster version when unset
    #[serde(default)]
    pub release: Option<String>,

    /// Maximum concurrent queries
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Stop issuing new queries after this many seconds
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

impl Default for FlakeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_BASE_URL.to_string(),
            release: None,
            concurrency: 8,
            request_timeout_secs: 10,
            deadline_secs: None,
        }
    }
}

impl FlakeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_concurrency() -> usize {
    8
}

fn default_request_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FlakeConfig::default();
        assert!(config.enabled);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.deadline().is_none());
        assert!(config.release.is_none());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: FlakeConfig = serde_json::from_str(r#"{"concurrency": 2}"#).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout_secs, 10);
    }
}
