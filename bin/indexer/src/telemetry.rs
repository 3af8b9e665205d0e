//! Tracing and metrics setup.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// `verbosity` raises the default level from `INFO`; `RUST_LOG` directives take precedence.
pub(crate) fn init_tracing_subscriber(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()
        .context("invalid RUST_LOG directives")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
        .context("failed to install the tracing subscriber")
}

/// Serves Prometheus metrics on `addr` and registers the indexer metrics.
pub(crate) fn init_prometheus_server(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install the prometheus exporter")?;
    unitscan_core::Metrics::init();

    info!(target: "prometheus", "Serving metrics at: http://{addr}");
    Ok(())
}
