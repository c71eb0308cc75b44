//! Configuration for the provcert CLI

use provcert_checks::DEFAULT_DOCS_BASE_URL;
use provcert_flake::FlakeConfig;
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `PROVCERT_FLAKE__CONCURRENCY=4`.
pub const ENV_PREFIX: &str = "PROVCERT";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvcertConfig {
    /// Flake corpus enrichment
    #[serde(default)]
    pub flake: FlakeConfig,

    /// Acceptance checks
    #[serde(default)]
    pub checks: ChecksConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Acceptance check configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecksConfig {
    /// Base URL of the rule documentation
    #[serde(default = "default_docs_base_url")]
    pub docs_base_url: String,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            docs_base_url: default_docs_base_url(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_docs_base_url() -> String {
    DEFAULT_DOCS_BASE_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ProvcertConfig {
    /// Load configuration: defaults, then the optional file, then environment.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&ProvcertConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
