use anyhow::Result;
use clap::{Parser, Subcommand};
use pyturbo::config::Config;
use pyturbo::gateway;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pyturbo", version, about = "PyTurbo AI gateway")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway.
    Serve {
        /// Bind host (overrides config).
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config).
        #[arg(long)]
        port: Option<u16>,
        /// Credential database path (overrides config).
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { host, port, db } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(db) = db {
                config.database.path = db;
            }
            gateway::run_gateway(&config).await
        }
    }
}
