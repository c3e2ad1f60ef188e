//! Daemon entry point for the Elasticsearch MCP adapter.
//!
//! Loads configuration from the environment and serves the MCP protocol over
//! stdio, or over streamable HTTP when an address is configured.

mod config;

use std::sync::Arc;

use datashift_core::store::ElasticsearchClient;
use datashift_mcp::SearchMcp;
use datashift_mcp::server::{McpHttpServerConfig, ServeError, serve_stdio, serve_streamable_http};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::SearchConfig;

#[tokio::main]
async fn main() -> Result<(), ServeError> {
    init_tracing();
    let config = SearchConfig::from_args()?;
    let client = ElasticsearchClient::new(&config.elasticsearch)?;
    info!(url = client.base_url(), "elasticsearch adapter starting");

    let service = SearchMcp::from_backend(Arc::new(client));
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
