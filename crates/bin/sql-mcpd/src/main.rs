//! Daemon entry point for the PostgreSQL MCP adapter.
//!
//! The connection pool opens lazily, so the adapter answers the handshake even
//! while the database is still starting.

mod config;

use std::sync::Arc;

use datashift_core::store::PgExecutor;
use datashift_mcp::SqlMcp;
use datashift_mcp::server::{McpHttpServerConfig, ServeError, serve_stdio, serve_streamable_http};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::SqlConfig;

#[tokio::main]
async fn main() -> Result<(), ServeError> {
    init_tracing();
    let config = SqlConfig::from_args()?;
    let executor = PgExecutor::connect_lazy(&config.postgres)?;
    info!(
        host = %config.postgres.host,
        database = %config.postgres.database,
        url_override = config.postgres.url.is_some(),
        "postgres adapter starting"
    );

    let service = SqlMcp::from_executor(Arc::new(executor));
    match config.http_addr {
        Some(addr) => serve_streamable_http(service, McpHttpServerConfig::new(addr)).await,
        None => serve_stdio(service).await,
    }
}

/// Logs go to stderr; stdout carries the protocol.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
