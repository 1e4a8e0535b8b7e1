//! Retrieval-augmented answers over the indexed viewing history

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::error::{Result, ViewlogError};
use crate::server::services::completion::{CompletionProvider, CompletionStream};
use crate::server::services::embeddings::EmbeddingClient;
use crate::server::services::vector_store::{QueryMatch, QueryOptions, VectorStoreClient, DEFAULT_QUERY_RESULTS};

pub const NO_RESULTS_ANSWER: &str = "I couldn't find any relevant viewing history data to answer your question. \
   Please try rephrasing your query or check if the data has been indexed.";
pub const GENERATION_FAILED_ANSWER: &str = "Failed to generate a response. Please try again.";

#[derive(Debug, Clone)]
pub struct RagOptions {
  pub n_results: usize,
  /// Provider-native metadata filter, e.g. `{"profile": 2}`
  pub filter: Option<Value>,
  pub stream: bool,
}

impl Default for RagOptions {
  fn default() -> Self {
    Self { n_results: DEFAULT_QUERY_RESULTS, filter: None, stream: false }
  }
}

/// One retrieved history entry backing an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntry {
  pub title: String,
  pub date: String,
  pub profile: Option<u32>,
  pub main_title: String,
  pub distance: f32,
  pub document: String,
}

impl SourceEntry {
  pub fn from_match(found: &QueryMatch) -> Self {
    let document = found.document.clone().unwrap_or_default();
    let field = |name: &str| {
      found
        .metadata
        .as_ref()
        .and_then(|m| m.get(name))
        .and_then(Value::as_str)
        .map(str::to_string)
    };

    Self {
      title: field("title").unwrap_or_else(|| document.clone()),
      date: field("date").unwrap_or_default(),
      profile: found
        .metadata
        .as_ref()
        .and_then(|m| m.get("profile"))
        .and_then(Value::as_u64)
        .and_then(|p| u32::try_from(p).ok()),
      main_title: field("mainTitle").unwrap_or_default(),
      distance: found.distance.unwrap_or(0.0),
      document,
    }
  }

  /// `1 - distance`, only when the distance is a finite value in `[0, 1]`
  pub fn relevance(&self) -> Option<f32> {
    (self.distance.is_finite() && (0.0..=1.0).contains(&self.distance)).then(|| 1.0 - self.distance)
  }

  fn display_main_title(&self) -> &str {
    if self.main_title.is_empty() {
      &self.title
    } else {
      &self.main_title
    }
  }

  fn display_profile(&self) -> String {
    self.profile.map(|p| p.to_string()).unwrap_or_default()
  }
}

/// Source rendered for people rather than machines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedSource {
  pub title: String,
  pub date: String,
  pub profile: String,
  pub main_title: String,
  pub relevance: String,
}

pub fn format_sources(sources: &[SourceEntry]) -> Vec<FormattedSource> {
  sources
    .iter()
    .map(|source| FormattedSource {
      title: source.title.clone(),
      date: source.date.clone(),
      profile: source.display_profile(),
      main_title: source.display_main_title().to_string(),
      relevance: source.relevance().map_or_else(|| "N/A".to_string(), |r| format!("{r:.2}")),
    })
    .collect()
}

/// Numbered context block, one entry per source
pub fn build_context(sources: &[SourceEntry]) -> String {
  sources
    .iter()
    .enumerate()
    .map(|(i, source)| {
      format!(
        "{}. Title: {}\n   Date: {}\n   Profile: {}\n   Main Title: {}",
        i + 1,
        source.title,
        source.date,
        source.display_profile(),
        source.display_main_title()
      )
    })
    .collect::<Vec<_>>()
    .join("\n\n")
}

pub fn build_prompt(query: &str, context: &str) -> String {
  format!(
    "You are a helpful assistant that analyzes Netflix viewing history data. \
     Use the following viewing history entries to answer the user's question.\n\n\
     Viewing History Context:\n{context}\n\n\
     User Question: {query}\n\n\
     Instructions:\n\
     - Analyze the viewing history entries provided above\n\
     - Provide a clear, concise answer based on the data\n\
     - If the question asks about patterns or trends, identify them from the data\n\
     - Mention specific titles, dates, or profiles when relevant\n\
     - If the data doesn't contain enough information to answer, say so\n\
     - Be conversational and helpful\n\n\
     Answer:"
  )
}

/// A whole answer, or a live stream of answer chunks
#[derive(Debug)]
pub enum Answer {
  Complete(String),
  Stream(CompletionStream),
}

#[derive(Debug)]
pub struct RagResponse {
  pub answer: Answer,
  pub sources: Vec<SourceEntry>,
}

impl RagResponse {
  /// Same entries as `sources`, kept for API compatibility
  pub fn relevant_entries(&self) -> &[SourceEntry] {
    &self.sources
  }
}

pub struct RagPipeline {
  embeddings: Arc<EmbeddingClient>,
  store: Arc<VectorStoreClient>,
  completion: Arc<dyn CompletionProvider>,
}

impl RagPipeline {
  pub fn new(
    embeddings: Arc<EmbeddingClient>,
    store: Arc<VectorStoreClient>,
    completion: Arc<dyn CompletionProvider>,
  ) -> Self {
    Self { embeddings, store, completion }
  }

  /// Answer a natural-language question from the indexed history
  pub async fn query(&self, query: &str, options: RagOptions) -> Result<RagResponse> {
    let result = if query.trim().is_empty() {
      Err(ViewlogError::InvalidQuery("query is empty".to_string()))
    } else {
      self.answer(query, options).await
    };

    result.map_err(|e| {
      error!("RAG query error: {e}");
      ViewlogError::RagQuery(Box::new(e))
    })
  }

  async fn answer(&self, query: &str, options: RagOptions) -> Result<RagResponse> {
    info!("Generating query embedding...");
    let embedding = self.embeddings.embed(query).await?;

    info!("Searching vector store for similar documents...");
    let query_options = QueryOptions { n_results: options.n_results, filter: options.filter, ..Default::default() };
    let results = self.store.query(&embedding, &query_options).await?;

    if results.is_empty() {
      return Ok(RagResponse { answer: Answer::Complete(NO_RESULTS_ANSWER.to_string()), sources: Vec::new() });
    }

    let sources: Vec<SourceEntry> = results.matches.iter().map(SourceEntry::from_match).collect();
    let prompt = build_prompt(query, &build_context(&sources));

    info!("Generating answer...");
    let answer = if options.stream {
      Answer::Stream(self.completion.stream(&prompt).await?)
    } else {
      let text = self.completion.complete(&prompt).await?;
      if text.trim().is_empty() {
        Answer::Complete(GENERATION_FAILED_ANSWER.to_string())
      } else {
        Answer::Complete(text)
      }
    };

    Ok(RagResponse { answer, sources })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn source(distance: f32) -> SourceEntry {
    SourceEntry {
      title: "Dark: Season 1: Secrets".to_string(),
      date: "2023-03-14".to_string(),
      profile: Some(3),
      main_title: "Dark".to_string(),
      distance,
      document: String::new(),
    }
  }

  #[test]
  fn from_match_falls_back_to_document_and_zero_distance() {
    let found = QueryMatch {
      id: "netflix_1_0_2024-01-01".to_string(),
      document: Some("Title: Up".to_string()),
      metadata: Some(json!({ "date": "2024-01-01", "profile": 1 })),
      ..Default::default()
    };

    let entry = SourceEntry::from_match(&found);
    assert_eq!(entry.title, "Title: Up");
    assert_eq!(entry.profile, Some(1));
    assert_eq!(entry.distance, 0.0);
    assert_eq!(entry.main_title, "");
  }

  #[test]
  fn relevance_only_for_unit_interval_distances() {
    assert_eq!(format_sources(&[source(0.25)])[0].relevance, "0.75");
    assert_eq!(format_sources(&[source(1.7)])[0].relevance, "N/A");
    assert_eq!(source(f32::NAN).relevance(), None);
  }

  #[test]
  fn context_numbers_entries_and_separates_with_blank_lines() {
    let mut second = source(0.5);
    second.main_title.clear();
    second.profile = None;

    let context = build_context(&[source(0.1), second]);
    assert_eq!(
      context,
      "1. Title: Dark: Season 1: Secrets\n   Date: 2023-03-14\n   Profile: 3\n   Main Title: Dark\n\n\
       2. Title: Dark: Season 1: Secrets\n   Date: 2023-03-14\n   Profile: \n   Main Title: Dark: Season 1: Secrets"
    );
  }

  #[test]
  fn prompt_embeds_context_and_question() {
    let prompt = build_prompt("What did I watch?", "1. Title: Up");
    assert!(prompt.starts_with("You are a helpful assistant that analyzes Netflix viewing history data. Use"));
    assert!(prompt.contains("question.\n\nViewing History Context:\n1. Title: Up\n\nUser Question:"));
    assert!(prompt.contains("User Question: What did I watch?\n\n"));
    assert!(prompt.ends_with("Be conversational and helpful\n\nAnswer:"));
  }
}
