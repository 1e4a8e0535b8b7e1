//! Viewlog REST Server
//!
//! HTTP server for indexing viewing-history exports and answering
//! questions about them.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use viewlog::config::Settings;
use viewlog::server::startup::start_server;

#[derive(Parser)]
#[command(name = "viewlog_server")]
#[command(about = "Viewlog REST API Server")]
#[command(version)]
struct Args {
  /// Server bind address
  #[arg(long, env = "VIEWLOG_BIND", default_value = "127.0.0.1:3001")]
  bind: SocketAddr,

  /// Directory holding NetflixViewingHistory_{n}.csv exports
  #[arg(long)]
  data_dir: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let filter = if args.verbose {
    EnvFilter::new("info,tower_http=debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("viewlog=info,tower_http=warn,warn"))
  };

  tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

  let mut settings = Settings::from_env()?;
  if let Some(data_dir) = args.data_dir {
    settings.history.data_dir = data_dir;
  }

  info!("Starting Viewlog REST Server v{}", env!("CARGO_PKG_VERSION"));
  info!("Reading exports from {}", settings.history.data_dir.display());

  start_server(args.bind, settings).await?;

  Ok(())
}
