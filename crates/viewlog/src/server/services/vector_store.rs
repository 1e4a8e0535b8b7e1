//! Vector store client
//!
//! Owns one named collection in a hosted vector database. The hosted API is
//! reached through `CollectionBackend`; this client adds create-if-absent
//! resolution with a process-wide cached handle, dimension checks, and
//! throttled batch upserts that halve on size-limit failures.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{ProviderError, Result, ViewlogError};

pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;
pub const DEFAULT_UPSERT_BATCH_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_QUERY_RESULTS: usize = 10;
pub const COLLECTION_DESCRIPTION: &str = "Netflix viewing history with embeddings";

/// Metadata stored alongside each vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
  pub title: String,
  pub date: String,
  pub profile: u32,
  pub main_title: String,
}

/// The unit stored in the collection
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
  pub id: String,
  pub text: String,
  pub metadata: DocumentMetadata,
  pub embedding: Vec<f32>,
}

/// Resolved reference to the hosted collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHandle {
  pub id: String,
  pub name: String,
  /// Vector length the provider enforces, once known
  pub dimension: Option<usize>,
}

/// Fields a query may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeField {
  Documents,
  Metadatas,
  Distances,
  Embeddings,
}

#[derive(Debug, Clone)]
pub struct QueryOptions {
  pub n_results: usize,
  /// Provider-native metadata filter
  pub filter: Option<Value>,
  pub include: Vec<IncludeField>,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      n_results: DEFAULT_QUERY_RESULTS,
      filter: None,
      include: vec![IncludeField::Metadatas, IncludeField::Documents, IncludeField::Distances],
    }
  }
}

/// One nearest-neighbour match; optional fields depend on `include`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryMatch {
  pub id: String,
  pub document: Option<String>,
  pub metadata: Option<Value>,
  pub distance: Option<f32>,
  pub embedding: Option<Vec<f32>>,
}

/// Matches ordered nearest-first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
  pub matches: Vec<QueryMatch>,
}

impl QueryResult {
  pub fn is_empty(&self) -> bool {
    self.matches.is_empty()
  }

  pub fn len(&self) -> usize {
    self.matches.len()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddSummary {
  pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearSummary {
  pub deleted_count: usize,
}

/// Raw operations of a hosted vector collection API
#[async_trait]
pub trait CollectionBackend: Send + Sync {
  async fn get_collection(&self, name: &str) -> Result<CollectionHandle>;

  async fn create_collection(&self, name: &str, metadata: &Value) -> Result<CollectionHandle>;

  /// Insert or replace documents by id
  async fn upsert(&self, collection: &CollectionHandle, documents: &[IndexedDocument]) -> Result<()>;

  async fn query(
    &self,
    collection: &CollectionHandle,
    embedding: &[f32],
    options: &QueryOptions,
  ) -> Result<QueryResult>;

  async fn count(&self, collection: &CollectionHandle) -> Result<usize>;

  async fn list_ids(&self, collection: &CollectionHandle) -> Result<Vec<String>>;

  async fn delete(&self, collection: &CollectionHandle, ids: &[String]) -> Result<()>;
}

pub struct VectorStoreClient {
  backend: Arc<dyn CollectionBackend>,
  collection_name: String,
  collection: OnceCell<CollectionHandle>,
  batch_delay: Duration,
}

impl VectorStoreClient {
  pub fn new(backend: Arc<dyn CollectionBackend>, collection_name: impl Into<String>) -> Self {
    Self {
      backend,
      collection_name: collection_name.into(),
      collection: OnceCell::new(),
      batch_delay: DEFAULT_UPSERT_BATCH_DELAY,
    }
  }

  /// Override the pause between upsert batches
  pub fn with_batch_delay(mut self, delay: Duration) -> Self {
    self.batch_delay = delay;
    self
  }

  pub fn collection_name(&self) -> &str {
    &self.collection_name
  }

  /// Resolve the collection, creating it if absent.
  ///
  /// Resolution happens at most once per client; concurrent first callers
  /// wait on the same initialization.
  pub async fn collection(&self) -> Result<CollectionHandle> {
    self.collection.get_or_try_init(|| self.resolve_collection()).await.cloned()
  }

  async fn resolve_collection(&self) -> Result<CollectionHandle> {
    let name = &self.collection_name;

    match self.backend.get_collection(name).await {
      Ok(handle) => {
        info!("Using existing collection: {name}");
        Ok(handle)
      }
      Err(ViewlogError::Provider(e)) if e.is_not_found() => {
        info!("Collection {name} not found, creating new collection...");
        let metadata = json!({ "description": COLLECTION_DESCRIPTION });

        match self.backend.create_collection(name, &metadata).await {
          Ok(handle) => {
            info!("Successfully created new collection: {name}");
            Ok(handle)
          }
          Err(ViewlogError::Provider(ProviderError::AlreadyExists(_))) => {
            info!("Collection {name} was created concurrently, reusing it");
            self.backend.get_collection(name).await
          }
          Err(e) => Err(e),
        }
      }
      Err(e) => Err(e),
    }
  }

  /// Upsert documents in throttled batches.
  ///
  /// A batch rejected as too large is split in half and retried until it
  /// fits; a single document that is still too large fails the call.
  pub async fn add_documents(&self, documents: &[IndexedDocument], batch_size: usize) -> Result<AddSummary> {
    if batch_size == 0 {
      return Err(ViewlogError::Validation("batch size must be a positive integer".to_string()));
    }
    if documents.is_empty() {
      return Ok(AddSummary { count: 0 });
    }

    let collection = self.collection().await?;
    check_dimensions(&collection, documents)?;

    let mut pending: VecDeque<&[IndexedDocument]> = documents.chunks(batch_size).collect();
    let mut added = 0;

    while let Some(batch) = pending.pop_front() {
      match self.backend.upsert(&collection, batch).await {
        Ok(()) => {
          added += batch.len();
          info!("Added batch of {} documents (Total: {added}/{})", batch.len(), documents.len());
        }
        Err(ViewlogError::Provider(ProviderError::PayloadTooLarge(message))) if batch.len() > 1 => {
          let half = batch.len() / 2;
          warn!("Batch of {} documents too large ({message}), retrying with batch size {half}", batch.len());
          for chunk in batch.chunks(half).rev() {
            pending.push_front(chunk);
          }
        }
        Err(e) => return Err(e),
      }

      if !pending.is_empty() {
        sleep(self.batch_delay).await;
      }
    }

    info!("Successfully added {added} documents to collection");
    Ok(AddSummary { count: added })
  }

  /// Nearest-neighbour query for one vector
  pub async fn query(&self, embedding: &[f32], options: &QueryOptions) -> Result<QueryResult> {
    if embedding.is_empty() {
      return Err(ViewlogError::Validation("query embedding must not be empty".to_string()));
    }
    if options.n_results == 0 {
      return Err(ViewlogError::Validation("nResults must be a positive integer".to_string()));
    }

    let collection = self.collection().await?;
    self.backend.query(&collection, embedding, options).await
  }

  pub async fn count(&self) -> Result<usize> {
    let collection = self.collection().await?;
    self.backend.count(&collection).await
  }

  /// Delete every document. Fetches all ids in one call; fine for a personal-size corpus.
  pub async fn clear(&self) -> Result<ClearSummary> {
    let collection = self.collection().await?;
    let ids = self.backend.list_ids(&collection).await?;

    if !ids.is_empty() {
      self.backend.delete(&collection, &ids).await?;
      info!("Deleted {} documents from collection", ids.len());
    }

    Ok(ClearSummary { deleted_count: ids.len() })
  }
}

fn check_dimensions(collection: &CollectionHandle, documents: &[IndexedDocument]) -> Result<()> {
  let expected = collection.dimension.unwrap_or_else(|| documents[0].embedding.len());

  for document in documents {
    let actual = document.embedding.len();
    if actual == 0 || actual != expected {
      return Err(ViewlogError::DimensionMismatch { id: document.id.clone(), expected, actual });
    }
  }
  Ok(())
}
