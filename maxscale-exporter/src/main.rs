//! Prometheus exporter for MariaDB MaxScale.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use maxscale_exporter::config::Overrides;
use maxscale_exporter::{ExporterConfig, HttpServer, MaxScaleCollector, init_tracing};

/// Prometheus exporter for MariaDB MaxScale.
#[derive(Parser, Debug)]
#[command(name = "maxscale-exporter")]
#[command(about = "Export MaxScale REST API statistics as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// Address to get MaxScale statistics from (host:port, optionally user:password@host:port).
    #[arg(long, env = "MAXSCALE_EXPORTER_ADDRESS")]
    address: Option<String>,

    /// The port that the MaxScale exporter listens on.
    #[arg(long, env = "MAXSCALE_EXPORTER_PORT")]
    port: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    let config = config.apply(Overrides {
        address: args.address,
        port: args.port,
        log_level: args.log_level,
    })?;

    init_tracing(&config.logging)?;

    info!("Starting MaxScale exporter");

    let collector = Arc::new(MaxScaleCollector::from_config(&config.maxscale)?);
    info!(
        target_host = %collector.target(),
        metrics = collector.describe().len(),
        "Scraping MaxScale REST API"
    );

    let listen_addr = config.prometheus.listen_addr()?;

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(
        collector.clone(),
        listen_addr,
        config.prometheus.path.clone(),
    );

    let mut http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for a shutdown signal, or for the server to exit on its own
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        error!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = &mut http_task => {
            anyhow::bail!("HTTP server exited unexpectedly");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for the server to drain
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    // Print final stats
    let stats = collector.stats();
    info!(
        scrapes = stats.scrapes,
        failed_scrapes = stats.failed_scrapes,
        last_scrape_duration_ms = stats.last_scrape_duration_ms,
        last_up = stats.last_up,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}
