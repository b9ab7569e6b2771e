use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use wpo_controller::ControllerConfig;

/// Default configuration file looked up when neither `--config` nor
/// `WPO_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "wpo.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub controller: ControllerSettings,
    /// Health endpoint listener
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Manifests seeded into the store at startup
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.workers == 0 {
            return Err(ConfigError::invalid("controller.workers must be > 0"));
        }
        if self.controller.backoff_base_ms == 0 {
            return Err(ConfigError::invalid("controller.backoff_base_ms must be > 0"));
        }
        if self.controller.backoff_max_ms < self.controller.backoff_base_ms {
            return Err(ConfigError::invalid(
                "controller.backoff_max_ms must be >= controller.backoff_base_ms",
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port must be > 0"));
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// Concurrent reconciliation workers
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

impl ControllerSettings {
    pub fn to_controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            workers: self.workers,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_max: Duration::from_millis(self.backoff_max_ms),
        }
    }
}

fn default_workers() -> usize {
    2
}
fn default_backoff_base_ms() -> u64 {
    5
}
fn default_backoff_max_ms() -> u64 {
    1_000_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8081
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BootstrapConfig {
    /// Directory of `*.json` / `*.toml` object manifests
    #[serde(default)]
    pub manifests_dir: Option<PathBuf>,
}

pub mod loader {
    use super::{AppConfig, ConfigError};
    use config::{Config, Environment, File};
    use std::path::Path;

    /// Environment source for `WPO__SECTION__KEY` overrides.
    pub fn environment() -> Environment {
        Environment::with_prefix("WPO")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    /// Loads and validates the configuration. A missing file is not an error.
    pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        load_config_with_env(path, environment())
    }

    pub fn load_config_with_env(
        path: Option<&Path>,
        env: Environment,
    ) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        let path = path.unwrap_or_else(|| Path::new(super::DEFAULT_CONFIG_PATH));
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }
        let merged: AppConfig = builder.add_source(env).build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }
}
