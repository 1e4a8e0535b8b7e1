//! Embedding client
//!
//! Turns text into vectors through an `EmbeddingProvider`. The client owns
//! the orchestration: input validation, the one-shot fallback model when the
//! primary model is missing, and rate-limited batching.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::error::{Result, ViewlogError};

pub const DEFAULT_EMBED_BATCH_SIZE: usize = 10;
pub const DEFAULT_EMBED_BATCH_DELAY: Duration = Duration::from_millis(100);

/// A hosted embedding model
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
  /// Embed `text` with the named model
  async fn embed_text(&self, model: &str, text: &str) -> Result<Vec<f32>>;

  /// Fail fast when the provider cannot be used at all (missing credentials)
  fn check_configured(&self) -> Result<()> {
    Ok(())
  }
}

pub struct EmbeddingClient {
  provider: Arc<dyn EmbeddingProvider>,
  model: String,
  fallback_model: String,
  batch_delay: Duration,
}

impl EmbeddingClient {
  pub fn new(
    provider: Arc<dyn EmbeddingProvider>,
    model: impl Into<String>,
    fallback_model: impl Into<String>,
  ) -> Self {
    Self {
      provider,
      model: model.into(),
      fallback_model: fallback_model.into(),
      batch_delay: DEFAULT_EMBED_BATCH_DELAY,
    }
  }

  /// Override the pause between batches
  pub fn with_batch_delay(mut self, delay: Duration) -> Self {
    self.batch_delay = delay;
    self
  }

  pub fn model(&self) -> &str {
    &self.model
  }

  /// Embed a single non-empty text
  pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
    if text.trim().is_empty() {
      return Err(ViewlogError::EmptyInput);
    }
    self.provider.check_configured()?;

    match self.provider.embed_text(&self.model, text).await {
      Ok(embedding) => require_values(embedding),
      Err(ViewlogError::Provider(e)) if e.is_not_found() => {
        warn!("Model {} not found, trying fallback model {}", self.model, self.fallback_model);
        self.embed_with_fallback(text).await
      }
      Err(ViewlogError::Provider(e)) => {
        error!("Embedding generation error: {e}");
        Err(ViewlogError::Embedding(e.to_string()))
      }
      Err(other) => Err(other),
    }
  }

  async fn embed_with_fallback(&self, text: &str) -> Result<Vec<f32>> {
    match self.provider.embed_text(&self.fallback_model, text).await {
      Ok(embedding) if !embedding.is_empty() => return Ok(embedding),
      Ok(_) => error!("Fallback embedding model {} returned an empty vector", self.fallback_model),
      Err(e) => error!("Fallback embedding model also failed: {e}"),
    }

    Err(ViewlogError::Embedding(format!(
      "Embedding model {} is not available. Please check available models.",
      self.model
    )))
  }

  /// Embed many texts in rate-limited batches.
  ///
  /// Items inside a batch run concurrently; batches run one after another
  /// with a fixed pause in between. A failed item yields `None` at its
  /// position instead of failing the whole call.
  pub async fn embed_batch(&self, texts: &[String], batch_size: usize) -> Result<Vec<Option<Vec<f32>>>> {
    if texts.is_empty() {
      return Err(ViewlogError::Validation("Texts must be a non-empty array".to_string()));
    }
    if batch_size == 0 {
      return Err(ViewlogError::Validation("batchSize must be a positive integer".to_string()));
    }
    self.provider.check_configured()?;

    let total_batches = texts.len().div_ceil(batch_size);
    let mut embeddings = Vec::with_capacity(texts.len());

    for (index, batch) in texts.chunks(batch_size).enumerate() {
      info!("Processing embedding batch {}/{total_batches}", index + 1);

      let results = join_all(batch.iter().map(|text| async move {
        match self.embed(text).await {
          Ok(embedding) => Some(embedding),
          Err(e) => {
            warn!("Failed to generate embedding for text: {}... ({e})", preview(text));
            None
          }
        }
      }))
      .await;
      embeddings.extend(results);

      if index + 1 < total_batches {
        sleep(self.batch_delay).await;
      }
    }

    let produced = embeddings.iter().filter(|e| e.is_some()).count();
    if produced != texts.len() {
      warn!("Generated {produced} embeddings out of {} texts", texts.len());
    }

    Ok(embeddings)
  }
}

fn require_values(embedding: Vec<f32>) -> Result<Vec<f32>> {
  if embedding.is_empty() {
    return Err(ViewlogError::Embedding("empty result".to_string()));
  }
  Ok(embedding)
}

fn preview(text: &str) -> String {
  text.chars().take(50).collect()
}
