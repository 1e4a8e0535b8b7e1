//! In-memory providers and fixtures shared by the integration tests
#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use viewlog::config::Settings;
use viewlog::error::{ProviderError, Result};
use viewlog::server::services::completion::{CompletionProvider, CompletionStream};
use viewlog::server::services::embeddings::EmbeddingProvider;
use viewlog::server::services::vector_store::{
  CollectionBackend, CollectionHandle, IndexedDocument, QueryMatch, QueryOptions, QueryResult,
};

pub const DIMENSION: usize = 8;

/// Deterministic, non-zero vector derived from the text
pub fn vector_for(text: &str) -> Vec<f32> {
  let seed: u32 = text.bytes().map(u32::from).sum();
  (0..DIMENSION).map(|i| ((seed * (i as u32 + 3)) % 97 + 1) as f32 / 98.0).collect()
}

// Embeddings
// ==========

#[derive(Default)]
pub struct FakeEmbeddings {
  failing: HashSet<String>,
  missing_models: HashSet<String>,
  unconfigured: bool,
  calls: Mutex<Vec<(String, String)>>,
}

impl FakeEmbeddings {
  pub fn new() -> Self {
    Self::default()
  }

  /// Fail every text containing `needle`
  pub fn failing_on(mut self, needle: &str) -> Self {
    self.failing.insert(needle.to_string());
    self
  }

  pub fn missing_model(mut self, model: &str) -> Self {
    self.missing_models.insert(model.to_string());
    self
  }

  pub fn unconfigured(mut self) -> Self {
    self.unconfigured = true;
    self
  }

  pub fn calls(&self) -> Vec<(String, String)> {
    self.calls.lock().unwrap().clone()
  }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbeddings {
  async fn embed_text(&self, model: &str, text: &str) -> Result<Vec<f32>> {
    self.calls.lock().unwrap().push((model.to_string(), text.to_string()));
    tokio::task::yield_now().await;

    if self.missing_models.contains(model) {
      return Err(ProviderError::ModelNotFound(format!("{model} is not found for API version v1beta")).into());
    }
    if self.failing.iter().any(|needle| text.contains(needle.as_str())) {
      return Err(ProviderError::Status { status: 400, message: "rejected".to_string() }.into());
    }
    Ok(vector_for(text))
  }

  fn check_configured(&self) -> Result<()> {
    if self.unconfigured {
      return Err(viewlog::error::ViewlogError::Configuration("Gemini API key is not configured".to_string()));
    }
    Ok(())
  }
}

// Collection
// ==========

#[derive(Default)]
struct CollectionState {
  handle: Option<CollectionHandle>,
  documents: Vec<IndexedDocument>,
  upserts: Vec<(usize, bool)>,
}

/// Hosted-collection stand-in with an optional per-request document limit
#[derive(Default)]
pub struct MemoryCollection {
  state: Mutex<CollectionState>,
  max_batch: Option<usize>,
  dimension: Option<usize>,
  create_conflict: bool,
  get_failure: Option<u16>,
  rejected_upsert: Option<(usize, u16)>,
  pub get_calls: AtomicUsize,
  pub create_calls: AtomicUsize,
}

impl MemoryCollection {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start with the collection already present
  pub fn existing() -> Self {
    let collection = Self::default();
    collection.state.lock().unwrap().handle = Some(handle("existing-id", None));
    collection
  }

  pub fn with_max_batch(mut self, max_batch: usize) -> Self {
    self.max_batch = Some(max_batch);
    self
  }

  pub fn with_dimension(mut self, dimension: usize) -> Self {
    self.dimension = Some(dimension);
    self
  }

  /// Simulate another process creating the collection first
  pub fn with_create_conflict(mut self) -> Self {
    self.create_conflict = true;
    self
  }

  /// Fail every collection lookup with `status`
  pub fn with_get_failure(mut self, status: u16) -> Self {
    self.get_failure = Some(status);
    self
  }

  /// Reject the upsert request at `index` (zero-based) with `status`
  pub fn with_rejected_upsert(mut self, index: usize, status: u16) -> Self {
    self.rejected_upsert = Some((index, status));
    self
  }

  pub fn documents(&self) -> Vec<IndexedDocument> {
    self.state.lock().unwrap().documents.clone()
  }

  /// `(batch length, accepted)` for every upsert request
  pub fn upserts(&self) -> Vec<(usize, bool)> {
    self.state.lock().unwrap().upserts.clone()
  }

  pub fn seed(&self, documents: Vec<IndexedDocument>) {
    self.state.lock().unwrap().documents.extend(documents);
  }

  fn handle(&self, id: &str) -> CollectionHandle {
    handle(id, self.dimension)
  }
}

fn handle(id: &str, dimension: Option<usize>) -> CollectionHandle {
  CollectionHandle { id: id.to_string(), name: "netflix_viewing_history".to_string(), dimension }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
  let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
  let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
  (1.0 - dot / (norm(a) * norm(b))).clamp(0.0, 1.0)
}

#[async_trait]
impl CollectionBackend for MemoryCollection {
  async fn get_collection(&self, name: &str) -> Result<CollectionHandle> {
    self.get_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(5)).await;

    if let Some(status) = self.get_failure {
      return Err(ProviderError::from_status(status, "internal error: backend unavailable").into());
    }

    self
      .state
      .lock()
      .unwrap()
      .handle
      .clone()
      .ok_or_else(|| ProviderError::from_status(404, format!("Collection {name} does not exist")).into())
  }

  async fn create_collection(&self, name: &str, _metadata: &Value) -> Result<CollectionHandle> {
    self.create_calls.fetch_add(1, Ordering::SeqCst);
    let mut state = self.state.lock().unwrap();
    state.handle = Some(self.handle("created-id"));

    if self.create_conflict {
      return Err(ProviderError::from_status(409, format!("Collection {name} already exists")).into());
    }
    Ok(self.handle("created-id"))
  }

  async fn upsert(&self, _collection: &CollectionHandle, documents: &[IndexedDocument]) -> Result<()> {
    let mut state = self.state.lock().unwrap();
    if let Some((index, status)) = self.rejected_upsert {
      if state.upserts.len() == index {
        state.upserts.push((documents.len(), false));
        return Err(ProviderError::from_status(status, "invalid record in batch").into());
      }
    }
    if self.max_batch.is_some_and(|max| documents.len() > max) {
      state.upserts.push((documents.len(), false));
      return Err(ProviderError::from_status(413, "Payload too large").into());
    }

    state.upserts.push((documents.len(), true));
    for document in documents {
      state.documents.retain(|d| d.id != document.id);
      state.documents.push(document.clone());
    }
    Ok(())
  }

  async fn query(
    &self,
    _collection: &CollectionHandle,
    embedding: &[f32],
    options: &QueryOptions,
  ) -> Result<QueryResult> {
    let state = self.state.lock().unwrap();
    let profile = options.filter.as_ref().and_then(|f| f.get("profile")).and_then(Value::as_u64);

    let mut matches: Vec<QueryMatch> = state
      .documents
      .iter()
      .filter(|d| profile.map_or(true, |p| u64::from(d.metadata.profile) == p))
      .map(|d| QueryMatch {
        id: d.id.clone(),
        document: Some(d.text.clone()),
        metadata: serde_json::to_value(&d.metadata).ok(),
        distance: Some(cosine_distance(embedding, &d.embedding)),
        embedding: None,
      })
      .collect();

    matches.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
    matches.truncate(options.n_results);
    Ok(QueryResult { matches })
  }

  async fn count(&self, _collection: &CollectionHandle) -> Result<usize> {
    Ok(self.state.lock().unwrap().documents.len())
  }

  async fn list_ids(&self, _collection: &CollectionHandle) -> Result<Vec<String>> {
    Ok(self.state.lock().unwrap().documents.iter().map(|d| d.id.clone()).collect())
  }

  async fn delete(&self, _collection: &CollectionHandle, ids: &[String]) -> Result<()> {
    self.state.lock().unwrap().documents.retain(|d| !ids.contains(&d.id));
    Ok(())
  }
}

// Completion
// ==========

/// Completion stand-in that records prompts and can stream its answer
pub struct FakeCompletion {
  answer: String,
  chunks: Vec<String>,
  fail_stream: bool,
  prompts: Mutex<Vec<String>>,
  pub calls: AtomicUsize,
  pub producer_stopped: Arc<AtomicBool>,
}

impl FakeCompletion {
  pub fn answering(answer: &str) -> Self {
    Self {
      answer: answer.to_string(),
      chunks: answer.split_inclusive(' ').map(str::to_string).collect(),
      fail_stream: false,
      prompts: Mutex::new(Vec::new()),
      calls: AtomicUsize::new(0),
      producer_stopped: Arc::new(AtomicBool::new(false)),
    }
  }

  pub fn with_chunks(mut self, chunks: Vec<String>) -> Self {
    self.chunks = chunks;
    self
  }

  /// End the stream with a provider error after the chunks
  pub fn failing_stream(mut self) -> Self {
    self.fail_stream = true;
    self
  }

  pub fn prompts(&self) -> Vec<String> {
    self.prompts.lock().unwrap().clone()
  }

  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl CompletionProvider for FakeCompletion {
  async fn complete(&self, prompt: &str) -> Result<String> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.prompts.lock().unwrap().push(prompt.to_string());
    Ok(self.answer.clone())
  }

  async fn stream(&self, prompt: &str) -> Result<CompletionStream> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.prompts.lock().unwrap().push(prompt.to_string());

    let (tx, rx) = mpsc::channel(1);
    let chunks = self.chunks.clone();
    let fail = self.fail_stream;
    let stopped = self.producer_stopped.clone();

    tokio::spawn(async move {
      for chunk in chunks {
        if tx.send(Ok(chunk)).await.is_err() {
          stopped.store(true, Ordering::SeqCst);
          return;
        }
      }
      if fail {
        let _ = tx.send(Err(ProviderError::Status { status: 500, message: "stream broke".to_string() })).await;
      }
    });

    Ok(rx)
  }
}

// Fixtures
// ========

/// Write `NetflixViewingHistory_{profile}.csv` with the export header
pub fn write_export(dir: &Path, profile: u32, rows: &[(&str, &str)]) {
  let mut content = String::from("Title,Date\n");
  for (title, date) in rows {
    content.push_str(&format!("\"{}\",\"{}\"\n", title.replace('"', "\"\""), date));
  }
  std::fs::write(dir.join(format!("NetflixViewingHistory_{profile}.csv")), content).unwrap();
}

/// Default settings reading exports from `data_dir`
pub fn settings_for(data_dir: &Path) -> Settings {
  let mut settings = Settings::default();
  settings.history.data_dir = data_dir.to_path_buf();
  settings
}
