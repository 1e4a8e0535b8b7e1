//! CLI command implementations; all work happens on the server

use std::io::Write;

use anyhow::{anyhow, Result};
use colored::*;
use futures::StreamExt;
use serde_json::json;

use crate::cli::client::get_client;
use crate::cli::display::{display_answer, display_sources};
use crate::server::types::{SearchEvent, SearchRequest};

pub async fn health() -> Result<()> {
  let client = get_client()?;
  let response = client.health().await?;

  println!("{} {} ({})", "✓".green(), response.message, client.base_url().cyan());
  Ok(())
}

pub async fn status() -> Result<()> {
  let client = get_client()?;
  let response = client.index_status().await?;

  println!("{} {} documents indexed", "📂".cyan(), response.count.to_string().bold());
  Ok(())
}

pub async fn index(clear: bool) -> Result<()> {
  let client = get_client()?;

  if clear {
    println!("{} Clearing collection and re-indexing viewing history...", "🔄".cyan());
  } else {
    println!("{} Indexing viewing history...", "🔄".cyan());
  }
  println!("   This may take several minutes for large exports");

  let response = client.index(clear).await?;
  println!(
    "{} Indexed {} entries ({} in collection)",
    "✓".green(),
    response.indexed.to_string().bold(),
    response.total_in_collection
  );
  Ok(())
}

pub async fn embed(text: &str) -> Result<()> {
  let client = get_client()?;
  let response = client.embed(text).await?;

  let preview: Vec<String> = response.embedding.iter().take(5).map(|v| format!("{v:.4}")).collect();
  println!("{} {} dimensions", "✓".green(), response.embedding.len().to_string().bold());
  println!("   [{}, ...]", preview.join(", "));
  Ok(())
}

pub async fn search(terms: &[String], n_results: usize, profile: Option<u32>, stream: bool) -> Result<()> {
  let query = terms.join(" ");
  if query.trim().is_empty() {
    return Err(anyhow!("Search query must not be empty"));
  }

  let client = get_client()?;
  let request = SearchRequest {
    query: Some(query),
    n_results: Some(n_results),
    filter: profile.map(|p| json!({ "profile": p })),
    stream,
  };

  if !stream {
    let response = client.search(&request).await?;
    display_answer(&response.answer);
    display_sources(&response.sources, terms);
    return Ok(());
  }

  let mut events = client.search_stream(&request).await?;
  let mut sources = Vec::new();
  println!("{}", "Answer".green().bold());

  while let Some(event) = events.next().await {
    match event? {
      SearchEvent::Sources(found) => sources = found,
      SearchEvent::Chunk(text) => {
        print!("{text}");
        std::io::stdout().flush()?;
      }
      SearchEvent::Done => break,
      SearchEvent::Error(message) => {
        println!();
        return Err(anyhow!("Answer stream failed: {message}"));
      }
    }
  }

  println!("\n");
  display_sources(&sources, terms);
  Ok(())
}
