mod connection;
mod handler;
mod server;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use dropfive_common::config::Config;

use crate::server::{Server, ServerOptions};

/// dropfive server - two-player five-in-a-row over plain TCP
#[derive(Parser, Debug)]
#[command(name = "dropfive-server", version, about)]
struct Args {
    /// JSON file with `host` and `port`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Milliseconds one poll waits for activity before counting as idle
    #[arg(long, default_value_t = 1000)]
    poll_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dropfive_server=debug,dropfive_common=debug".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::resolve(args.config.as_deref(), args.host, args.port)?;
    let options = ServerOptions {
        poll_interval: Duration::from_millis(args.poll_ms),
        ..ServerOptions::default()
    };

    tracing::info!("Starting dropfive server on {}", config.address());
    let server = Server::bind(&config.address(), options).await?;
    server.serve().await?;
    tracing::info!("Server stopped");
    Ok(())
}
