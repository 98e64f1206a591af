mod repl;

use std::io::ErrorKind;
use std::path::PathBuf;

use clap::Parser;
use tokio::io::BufReader;

use dropfive_common::config::Config;

use crate::repl::ServerConnection;

/// dropfive client - type a column number to drop a piece
#[derive(Parser, Debug)]
#[command(name = "dropfive-client", version, about)]
struct Args {
    /// JSON file with `host` and `port`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dropfive_client=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::resolve(args.config.as_deref(), args.host, args.port)?;

    println!("connecting to {} port {}", config.host, config.port);
    let mut conn = match ServerConnection::connect(&config.address()).await {
        Ok(conn) => conn,
        Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
            println!(
                "Connection refused. Please make sure the server is live before running the client."
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!("Connected to {}", config.address());

    let stdin = BufReader::new(tokio::io::stdin());
    repl::run(&mut conn, stdin, &mut std::io::stdout()).await
}
