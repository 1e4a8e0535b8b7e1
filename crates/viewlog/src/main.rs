use anyhow::Result;
use clap::{Parser, Subcommand};
use viewlog::cli::commands;

#[derive(Parser)]
#[command(name = "viewlog")]
#[command(about = "Viewlog - Ask questions about your viewing history\nTalks to a running viewlog_server")]
#[command(version)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Check that the server is up
  Health,
  /// Show how many entries are indexed
  Status,
  /// Index every profile export on the server
  Index {
    /// Delete existing entries first
    #[arg(long)]
    clear: bool,
  },
  /// Embed a text and print a preview of its vector
  Embed {
    text: String,
  },
  /// Ask a question about the viewing history
  Search {
    /// Question terms (space-separated)
    #[arg(required = true)]
    terms: Vec<String>,
    /// Number of history entries to retrieve
    #[arg(short = 'n', long = "results", default_value_t = 10)]
    results: usize,
    /// Restrict retrieval to one profile
    #[arg(short, long)]
    profile: Option<u32>,
    /// Print the answer as it is generated
    #[arg(short, long)]
    stream: bool,
  },
}

async fn handle(command: Command) -> Result<()> {
  match command {
    Command::Health => commands::health().await,
    Command::Status => commands::status().await,
    Command::Index { clear } => commands::index(clear).await,
    Command::Embed { text } => commands::embed(&text).await,
    Command::Search { terms, results, profile, stream } => commands::search(&terms, results, profile, stream).await,
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  handle(cli.command).await?;
  Ok(())
}
