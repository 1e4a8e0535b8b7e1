//! Generative completion seam
//!
//! Completions come back either whole or as a stream of text chunks over a
//! bounded channel. Dropping the receiver tells the producer to stop.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{ProviderError, Result};

/// Chunks a streaming producer may buffer ahead of its consumer
pub const STREAM_BUFFER: usize = 32;

/// Forward-only, non-restartable sequence of answer chunks.
///
/// The channel closing without an error item marks the end of the answer.
pub type CompletionStream = mpsc::Receiver<std::result::Result<String, ProviderError>>;

/// Sampling parameters sent with every completion request
#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
  pub temperature: f32,
  pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
  fn default() -> Self {
    Self { temperature: 0.7, max_output_tokens: 2000 }
  }
}

/// A hosted generative model
#[async_trait]
pub trait CompletionProvider: Send + Sync {
  /// Generate the full answer for `prompt`; empty when the model produced no candidate
  async fn complete(&self, prompt: &str) -> Result<String>;

  /// Start a streamed answer for `prompt`
  async fn stream(&self, prompt: &str) -> Result<CompletionStream>;
}
