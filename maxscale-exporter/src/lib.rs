//! Prometheus metrics exporter for MariaDB MaxScale.
//!
//! Every scrape of the `/metrics` endpoint queries the MaxScale REST API,
//! walks the returned status documents and exposes the recognized fields as
//! Prometheus metrics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  MaxScale REST  │<────│    Collector    │<────│   HTTP Server   │
//! │ /v1/services    │     │ fetch → walk →  │     │   (/metrics)    │
//! │ /v1/servers     │────>│ normalize→ sink │────>│                 │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! - [`catalog`] - Field key to metric descriptor tables
//! - [`fetcher`] - HTTP client for the REST API
//! - [`walker`] - Extraction of labeled raw values from status documents
//! - [`normalize`] - Raw value and server state conversion
//! - [`collector`] - One scrape cycle and the `up` health gauge
//! - [`exposition`] - Text exposition format sink
//!
//! # Usage
//!
//! ```bash
//! maxscale-exporter --address admin:mariadb@127.0.0.1:8989 --port 9195
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod catalog;
pub mod collector;
pub mod config;
pub mod error;
pub mod exposition;
pub mod fetcher;
pub mod http;
pub mod normalize;
pub mod walker;

pub use collector::{MaxScaleCollector, ScrapeResult, SharedCollector};
pub use config::{ConfigError, ExporterConfig, LogFormat, LoggingConfig};
pub use error::{Result, ScrapeError};
pub use http::HttpServer;

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> std::result::Result<(), ConfigError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| ConfigError::Logging(e.to_string()))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| ConfigError::Logging(e.to_string()))?;
        }
    }

    Ok(())
}
