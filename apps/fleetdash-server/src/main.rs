//! Demo profile backend.
//!
//! Serves one seeded profile over the session and profile endpoints
//! until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fleetdash_api::{router::Router, server::Server};
use fleetdash_core::{FormConfig, PasswordPolicy};
use fleetdash_runtime::{ProfileStore, DEMO_EMAIL, DEMO_PASSWORD};
use tokio::signal;

/// Command-line arguments for the profile server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    request_timeout_ms: u64,

    /// Response timeout in milliseconds
    #[arg(long, default_value_t = 10000)]
    response_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt::init();

    let config = Arc::new(FormConfig {
        request_timeout_ms: args.request_timeout_ms,
        response_timeout_ms: args.response_timeout_ms,
        ..Default::default()
    });

    let store = ProfileStore::demo(PasswordPolicy::from_config(&config))
        .context("Failed to seed demo profile")?;
    let router = Router::new(Arc::new(store), Arc::clone(&config));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, args.port))?;
    let server = Server::new(addr, router);

    println!("Starting fleetdash profile server...");
    println!("  Host: {}", args.host);
    println!("  Port: {}", args.port);
    println!("  Request timeout: {} ms", args.request_timeout_ms);
    println!("  Response timeout: {} ms", args.response_timeout_ms);
    println!("  Demo login: {} / {}", DEMO_EMAIL, DEMO_PASSWORD);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve().await {
            tracing::error!("Server error: {}", e);
        }
    });

    signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c")?;
    println!("\nShutting down server...");
    server_handle.abort();

    Ok(())
}
