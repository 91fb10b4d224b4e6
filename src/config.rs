use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use validator::Validate;

const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";
const CONFIG_DIR: &str = "config";

/// Application configuration, layered from `config/default.toml`, an optional
/// per-environment file, and `STOCKLEDGER_*` environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL (postgres or sqlite).
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Deployment environment name ("development", "test", "production").
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log filter passed to tracing-subscriber when the caller does not set
    /// RUST_LOG.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum database connections.
    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    /// Event channel buffer size.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_event_buffer() -> usize {
    100
}

impl AppConfig {
    /// Loads configuration for the environment named by `RUN_ENV` (falling
    /// back to "development").
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

        let config = Config::builder()
            .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
            .add_source(
                File::with_name(&format!("{}/{}", CONFIG_DIR, environment)).required(false),
            )
            .add_source(Environment::with_prefix("STOCKLEDGER"))
            .set_default("environment", environment.clone())?
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config
            .validate()
            .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;
        Ok(app_config)
    }

    /// Minimal configuration for tests and embedded use.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            environment: "test".to_string(),
            log_level: default_log_level(),
            db_max_connections: default_max_connections(),
            event_buffer: default_event_buffer(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_fills_defaults() {
        let cfg = AppConfig::new("sqlite::memory:");
        assert_eq!(cfg.environment, "test");
        assert_eq!(cfg.db_max_connections, 10);
        assert!(!cfg.is_production());
    }
}
