//! Bifrost Control Service
//!
//! Bootstraps the endpoint store and runs one command against it.

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use bifrost_core::config::load_config;
use bifrost_core::tracing_init::init_tracing;
use bifrost_server::{ServiceFactory, cmd};

#[derive(Parser, Debug)]
#[command(name = "bifrost-server")]
#[command(version, about = "Bifrost control service - endpoint registry")]
struct Args {
    /// Path to a JSON settings file.
    #[arg(long, env = "BIFROST_CONFIG")]
    config: Option<PathBuf>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Transaction isolation level (e.g. serializable, engine-default).
    #[arg(long)]
    isolation_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create any missing tables and exit.
    Init,
    /// Register a named endpoint.
    CreateEndpoint {
        #[arg(long)]
        name: String,
        #[arg(long)]
        owner: String,
    },
    /// List registered endpoints.
    ListEndpoints,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing("bifrost_server=info,bifrost_store=info", args.log_json);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(path) = args.db_path {
        config.store.database_path = Some(path);
    }
    if let Some(level) = args.isolation_level {
        config.store.isolation_level = level;
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting bifrost-server");
    let service = ServiceFactory::create(&config).await?;

    let mut out = io::stdout();
    match args.command {
        Command::Init => cmd::init(&service, &mut out)?,
        Command::CreateEndpoint { name, owner } => {
            cmd::create_endpoint(&service, &name, &owner, &mut out).await?;
        }
        Command::ListEndpoints => cmd::list_endpoints(&service, &mut out).await?,
    }

    Ok(())
}
