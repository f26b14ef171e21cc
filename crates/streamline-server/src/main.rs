//! Streamable HTTP JSON-RPC server with the demo capabilities.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p streamline-server -- --bind 127.0.0.1:8000
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use streamline_http::ServerConfig;
use streamline_server::{DemoPacing, demo_server};

#[derive(Parser, Debug)]
#[command(name = "streamline-server")]
#[command(about = "JSON-RPC 2.0 over Streamable HTTP")]
struct Args {
    /// Address to listen on
    #[arg(short, long, env = "STREAMLINE_BIND", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Endpoint path
    #[arg(short, long, env = "STREAMLINE_PATH", default_value = "/mcp")]
    path: String,

    /// Seconds between heartbeats on the GET push stream
    #[arg(long, env = "STREAMLINE_HEARTBEAT_SECS", default_value_t = 2)]
    heartbeat_secs: u64,

    /// Additional allowed Origin prefixes (comma separated), on top of loopback
    #[arg(long, env = "STREAMLINE_ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,

    /// Maximum POST body size in bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    max_body_size: usize,

    /// Disable CORS headers and OPTIONS handling
    #[arg(long)]
    no_cors: bool,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig {
            bind_address: self.bind,
            mcp_path: self.path.clone(),
            heartbeat_interval: Duration::from_secs(self.heartbeat_secs),
            max_body_size: self.max_body_size,
            enable_cors: !self.no_cors,
            ..ServerConfig::default()
        };
        config.allowed_origins.extend(
            self.allowed_origins
                .iter()
                .map(|origin| origin.trim())
                .filter(|origin| !origin.is_empty())
                .map(str::to_string),
        );
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.server_config();
    if !config.bind_address.ip().is_loopback() {
        tracing::warn!(
            "Binding to non-loopback address {}; only Origin checks protect this server",
            config.bind_address
        );
    }

    let server = demo_server(config, DemoPacing::default()).context("invalid server configuration")?;
    let listener = TcpListener::bind(server.config().bind_address)
        .await
        .with_context(|| format!("failed to bind {}", server.config().bind_address))?;

    info!(
        "Serving http://{}{}",
        listener.local_addr()?,
        server.config().mcp_path
    );

    server
        .run_until(listener, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {}", err);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
