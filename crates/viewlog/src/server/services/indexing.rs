//! Indexing pipeline: CSV exports into the vector collection
//!
//! Loading tolerates per-file failures. Every stage after loading is fatal
//! for the run, and nothing is written unless every document got a vector.

use std::sync::Arc;

use tracing::info;

use crate::error::{Result, ViewlogError};
use crate::history::{load_profiles, HistorySource, ViewingRecord};
use crate::server::services::embeddings::EmbeddingClient;
use crate::server::services::vector_store::{
  DocumentMetadata, IndexedDocument, VectorStoreClient, DEFAULT_UPSERT_BATCH_SIZE,
};

pub const INDEX_EMBED_BATCH_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
  /// Delete every existing document before indexing
  pub clear: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSummary {
  pub indexed: usize,
  pub total_in_collection: usize,
}

pub struct IndexingPipeline {
  embeddings: Arc<EmbeddingClient>,
  store: Arc<VectorStoreClient>,
  source: HistorySource,
}

impl IndexingPipeline {
  pub fn new(embeddings: Arc<EmbeddingClient>, store: Arc<VectorStoreClient>, source: HistorySource) -> Self {
    Self { embeddings, store, source }
  }

  pub fn source(&self) -> &HistorySource {
    &self.source
  }

  /// Load every profile export and index it
  pub async fn run(&self, options: IndexOptions) -> Result<IndexSummary> {
    if options.clear {
      let cleared = self.store.clear().await?;
      info!("Cleared {} documents before indexing", cleared.deleted_count);
    }

    let records = load_profiles(&self.source).await;
    self.index_records(&records).await
  }

  /// Embed and upsert already-loaded records
  pub async fn index_records(&self, records: &[ViewingRecord]) -> Result<IndexSummary> {
    if records.is_empty() {
      return Err(ViewlogError::NoData);
    }
    info!("Total rows to index: {}", records.len());

    let texts: Vec<String> = records.iter().map(document_text).collect();

    info!("Generating embeddings...");
    let embeddings: Vec<Vec<f32>> = self
      .embeddings
      .embed_batch(&texts, INDEX_EMBED_BATCH_SIZE)
      .await?
      .into_iter()
      .flatten()
      .collect();

    if embeddings.len() != records.len() {
      return Err(ViewlogError::PartialResult { expected: records.len(), actual: embeddings.len() });
    }

    let documents: Vec<IndexedDocument> = records
      .iter()
      .zip(texts)
      .zip(embeddings)
      .enumerate()
      .map(|(index, ((record, text), embedding))| IndexedDocument {
        id: document_id(record, index),
        text,
        metadata: document_metadata(record),
        embedding,
      })
      .collect();

    info!("Adding documents to vector store...");
    self.store.add_documents(&documents, DEFAULT_UPSERT_BATCH_SIZE).await?;

    let total_in_collection = self.store.count().await?;
    Ok(IndexSummary { indexed: documents.len(), total_in_collection })
  }
}

/// Stable per-run id; the row index keeps same-day rewatches distinct
pub fn document_id(record: &ViewingRecord, row_index: usize) -> String {
  format!("netflix_{}_{}_{}", record.profile, row_index, record.date)
}

/// Text used both as embedding input and stored payload
pub fn document_text(record: &ViewingRecord) -> String {
  format!(
    "Title: {}\nDate: {}\nProfile: {}\nMain Title: {}",
    record.title,
    record.date,
    record.profile,
    main_or_full_title(record)
  )
}

pub fn document_metadata(record: &ViewingRecord) -> DocumentMetadata {
  DocumentMetadata {
    title: record.title.clone(),
    date: record.date.clone(),
    profile: record.profile,
    main_title: main_or_full_title(record).to_string(),
  }
}

fn main_or_full_title(record: &ViewingRecord) -> &str {
  if record.main_title.is_empty() {
    &record.title
  } else {
    &record.main_title
  }
}
