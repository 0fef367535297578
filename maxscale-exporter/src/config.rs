//! Configuration for the MaxScale exporter.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Failed to initialize tracing: {0}")]
    Logging(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Upstream MaxScale REST API settings.
    #[serde(default)]
    pub maxscale: MaxScaleConfig,

    /// Prometheus endpoint settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// MaxScale REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxScaleConfig {
    /// `host:port` of the REST API, optionally `user:password@host:port`.
    #[serde(default = "default_address")]
    pub address: String,

    /// Deadline for one whole scrape in seconds; 0 disables it.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_address() -> String {
    "admin:mariadb@127.0.0.1:8989".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for MaxScaleConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Port to listen on (default: "9195").
    #[serde(default = "default_port")]
    pub port: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_port() -> String {
    "9195".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_path(),
        }
    }
}

impl PrometheusConfig {
    /// Socket address to bind, on all interfaces.
    pub fn listen_addr(&self) -> Result<std::net::SocketAddr, ConfigError> {
        let port: u16 = self
            .port
            .parse()
            .map_err(|_| ConfigError::Validation(format!("Invalid listen port: {}", self.port)))?;
        Ok(std::net::SocketAddr::from(([0, 0, 0, 0], port)))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Values given on the command line or through the environment.
///
/// `None` leaves the file or built-in value untouched.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub address: Option<String>,
    pub port: Option<String>,
    pub log_level: Option<String>,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ExporterConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line and environment overrides, then re-validate.
    pub fn apply(mut self, overrides: Overrides) -> Result<Self, ConfigError> {
        if let Some(address) = overrides.address {
            self.maxscale.address = address;
        }
        if let Some(port) = overrides.port {
            self.prometheus.port = port;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let address = self.maxscale.address.trim();
        if address.is_empty() {
            return Err(ConfigError::Validation(
                "MaxScale address must not be empty".to_string(),
            ));
        }

        if address.contains("://") {
            return Err(ConfigError::Validation(format!(
                "MaxScale address must be host:port without a scheme: {}",
                self.maxscale.address
            )));
        }

        // Validate listen port
        self.prometheus.listen_addr()?;

        // Validate path starts with /
        if !self.prometheus.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if self.prometheus.path == "/" {
            return Err(ConfigError::Validation(
                "Metrics path must not be the landing page /".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.maxscale.address, "admin:mariadb@127.0.0.1:8989");
        assert_eq!(config.maxscale.timeout_secs, 10);
        assert_eq!(config.prometheus.port, "9195");
        assert_eq!(config.prometheus.path, "/metrics");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            maxscale: {
                address: "monitor:secret@maxscale.internal:8989",
                timeout_secs: 3,
            },
            prometheus: {
                port: "9200",
                path: "/prometheus/metrics",
            },
            logging: {
                level: "debug",
                format: "json",
            },
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.maxscale.address, "monitor:secret@maxscale.internal:8989");
        assert_eq!(config.maxscale.timeout_secs, 3);
        assert_eq!(config.prometheus.port, "9200");
        assert_eq!(config.prometheus.path, "/prometheus/metrics");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_listen_addr() {
        let config = ExporterConfig::default();
        assert_eq!(
            config.prometheus.listen_addr().unwrap().to_string(),
            "0.0.0.0:9195"
        );
    }

    #[test]
    fn test_validate_invalid_port() {
        let result = ExporterConfig::parse(r#"{ prometheus: { port: "http" } }"#);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen port")
        );
    }

    #[test]
    fn test_validate_invalid_path() {
        let result = ExporterConfig::parse(r#"{ prometheus: { path: "no-leading-slash" } }"#);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("must start with /")
        );
    }

    #[test]
    fn test_validate_root_path() {
        let result = ExporterConfig::parse(r#"{ prometheus: { path: "/" } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_address_with_scheme() {
        let result = ExporterConfig::parse(r#"{ maxscale: { address: "http://localhost:8989" } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = ExporterConfig::parse(r#"{ maxscale: { address: "file-host:8989" } }"#)
            .unwrap()
            .apply(Overrides {
                address: Some("cli-host:8989".to_string()),
                port: None,
                log_level: Some("trace".to_string()),
            })
            .unwrap();

        assert_eq!(config.maxscale.address, "cli-host:8989");
        assert_eq!(config.prometheus.port, "9195");
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_overrides_are_validated() {
        let result = ExporterConfig::default().apply(Overrides {
            port: Some("99999".to_string()),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ maxscale: {{ address: \"10.0.0.5:8989\" }} }}").unwrap();

        let config = ExporterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.maxscale.address, "10.0.0.5:8989");
    }

    #[test]
    fn test_load_missing_file() {
        let result = ExporterConfig::load_from_file("/nonexistent/maxscale-exporter.json5");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
