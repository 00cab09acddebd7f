//! Application configuration management.

use serde::Deserialize;

use crate::types::RoundingMode;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Transaction engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Payment processor configuration.
    #[serde(default)]
    pub processor: ProcessorConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Transaction engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// How many times a plan is recomputed after a commit-time conflict.
    #[serde(default = "default_max_replan_attempts")]
    pub max_replan_attempts: u32,
    /// Rounding mode used when a checkout does not specify one.
    #[serde(default)]
    pub default_rounding_mode: RoundingMode,
}

fn default_max_replan_attempts() -> u32 {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_replan_attempts: default_max_replan_attempts(),
            default_rounding_mode: RoundingMode::default(),
        }
    }
}

/// Payment processor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    /// Base URL of the processor API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Secret API key. The processor rail is disabled when absent.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            secret_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TESSERA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
