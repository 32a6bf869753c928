//! MCP server for GitHub project task queries.
//!
//! Exposes board retrieval, child lookup, and fuzzy title search as Model
//! Context Protocol (MCP) tools over stdio.

mod server;

use std::path::Path;

use anyhow::{Context, Result};
use boardtree::{Client, Config};
use rmcp::{transport::stdio, ServiceExt};
use server::BoardMcpServer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to stderr (stdout is reserved for JSON-RPC)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let token =
        std::env::var("GITHUB_TOKEN").context("GITHUB_TOKEN environment variable required")?;
    let config = Config::load_or_default(Path::new(".")).map_err(anyhow::Error::msg)?;
    let default_org = std::env::var("GITHUB_ORG").ok().or_else(|| config.org.clone());

    // The blocking HTTP client must be built and used off the async runtime.
    let client = tokio::task::spawn_blocking(move || Client::new(token)).await??;

    tracing::info!("Starting MCP server over stdio");
    let service = BoardMcpServer::new(client, config.fields, default_org)
        .serve(stdio())
        .await?;
    let quit_reason = service.waiting().await?;
    tracing::info!("Server stopped: {:?}", quit_reason);

    Ok(())
}
