//! Client configuration loaded from TOML

use crate::error::SpecError;
use crate::request::HostEndpoint;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Return raw engine responses with debug info attached
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9200
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub read_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_timeout_secs(),
            read_timeout_secs: default_timeout_secs(),
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Per-request timeout handed to the session
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info,quarry=debug".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

impl ObservabilityConfig {
    /// Install the global tracing subscriber
    pub fn init_tracing(&self) -> Result<()> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| self.log_format.clone());

        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        let installed = if format == "json" {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        installed.map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
    }
}

impl Config {
    /// Load config from a file, falling back to defaults when it is absent
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    /// Load config from file path, or create default
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load_from(config_path)
        } else {
            let config = Config::default();
            config.save(config_path)?;
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn host_endpoint(&self) -> std::result::Result<HostEndpoint, SpecError> {
        HostEndpoint::with_scheme(&self.endpoint.scheme, &self.endpoint.host, self.endpoint.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.endpoint.scheme, "http");
        assert_eq!(config.endpoint.port, 9200);
        assert_eq!(config.transport.connect_timeout_secs, 30);
        assert_eq!(config.transport.timeout(), Duration::from_secs(30));
        assert_eq!(config.observability.log_format, "pretty");
        assert!(!config.debug);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
debug = true

[endpoint]
host = "search.internal"

[observability]
log_format = "json"
"#,
        )
        .unwrap();
        assert!(config.debug);
        assert_eq!(config.endpoint.host, "search.internal");
        assert_eq!(config.endpoint.port, 9200);
        assert_eq!(config.observability.log_format, "json");
        assert_eq!(config.observability.log_level, "info,quarry=debug");
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let temp = tempdir().unwrap();
        let config = Config::load_from(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config.endpoint.host, "127.0.0.1");
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("conf").join("quarry.toml");
        Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.transport.read_timeout_secs, 30);
    }

    #[test]
    fn test_save_and_load() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("quarry.toml");

        let mut config = Config::default();
        config.endpoint.host = "10.0.0.5".to_string();
        config.endpoint.port = 9300;
        config.transport.read_timeout_secs = 5;
        config.save(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.endpoint.host, "10.0.0.5");
        assert_eq!(loaded.transport.timeout(), Duration::from_secs(5));
        assert_eq!(
            loaded.host_endpoint().unwrap().to_string(),
            "http://10.0.0.5:9300/"
        );
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "endpoint = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
