//! qr-offline server entry point.
//!
//! Boots the caching worker and exposes its events as MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use qrsw_client::{FetchClient, FetchConfig, LoggingHost, ServiceWorker, WorkerConfig};
use qrsw_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(
        origin = %config.origin,
        version = %config.version,
        db = %config.db_path.display(),
        "Starting qr-offline server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let worker = ServiceWorker::new(WorkerConfig::from_app(&config)?, db, Arc::new(network), Arc::new(LoggingHost));

    let handler = handler::OfflineCacheServer::new(worker);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
