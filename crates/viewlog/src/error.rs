//! Error types for the viewlog library
//!
//! `ProviderError` describes failures at the hosted-service seam and is
//! classified so the clients can recover from the few conditions they know
//! how to handle. `ViewlogError` is what the clients and pipelines return.

use thiserror::Error;

/// Failure reported by (or while talking to) a hosted provider
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
  /// The requested model does not exist for this API version
  #[error("model not found: {0}")]
  ModelNotFound(String),

  /// The addressed resource (collection, record) does not exist
  #[error("not found: {0}")]
  NotFound(String),

  /// A concurrent creator already made the resource
  #[error("already exists: {0}")]
  AlreadyExists(String),

  /// The request body exceeded the provider's size limit
  #[error("Payload too large: {0}")]
  PayloadTooLarge(String),

  /// Any other non-success HTTP answer
  #[error("provider returned status {status}: {message}")]
  Status { status: u16, message: String },

  /// Connection, timeout or TLS failure before a response arrived
  #[error("transport error: {0}")]
  Transport(String),

  /// The response arrived but did not have the expected shape
  #[error("unexpected response: {0}")]
  Decode(String),
}

impl ProviderError {
  /// Classify a non-success HTTP answer from its status code and message.
  ///
  /// Providers are inconsistent about how they report conditions, so the
  /// status code wins and message substrings are the fallback.
  pub fn from_status(status: u16, message: impl Into<String>) -> Self {
    let message = message.into();
    let lowered = message.to_lowercase();

    if status == 413 || lowered.contains("payload too large") {
      return Self::PayloadTooLarge(message);
    }
    if status == 409 || lowered.contains("already exists") {
      return Self::AlreadyExists(message);
    }
    if status == 404
      || lowered.contains("not found")
      || lowered.contains("could not be found")
      || lowered.contains("does not exist")
    {
      return Self::NotFound(message);
    }

    Self::Status { status, message }
  }

  /// Whether the failure may succeed on an identical retry
  pub fn is_transient(&self) -> bool {
    match self {
      Self::Transport(_) => true,
      Self::Status { status, .. } => *status == 429 || *status >= 500,
      _ => false,
    }
  }

  /// Whether the provider reported a missing resource or model.
  ///
  /// Relies on the status classification only; a "404" inside some other
  /// failure's text (a URL, an upstream message) does not count.
  pub fn is_not_found(&self) -> bool {
    match self {
      Self::NotFound(_) | Self::ModelNotFound(_) => true,
      Self::Status { status, .. } => *status == 404,
      _ => false,
    }
  }
}

impl From<reqwest::Error> for ProviderError {
  fn from(error: reqwest::Error) -> Self {
    if error.is_decode() {
      Self::Decode(error.to_string())
    } else if let Some(status) = error.status() {
      Self::from_status(status.as_u16(), error.to_string())
    } else {
      Self::Transport(error.to_string())
    }
  }
}

/// Errors returned by the viewlog clients and pipelines
#[derive(Debug, Error)]
pub enum ViewlogError {
  /// Required credentials or settings are missing
  #[error("{0}")]
  Configuration(String),

  /// Malformed caller input
  #[error("{0}")]
  Validation(String),

  /// Text to embed was empty after trimming
  #[error("Text must be a non-empty string")]
  EmptyInput,

  /// Search query was empty after trimming
  #[error("Query is required and must be a non-empty string: {0}")]
  InvalidQuery(String),

  /// The embedding provider failed and no fallback applied
  #[error("Failed to generate embedding: {0}")]
  Embedding(String),

  /// A hosted provider failed
  #[error(transparent)]
  Provider(#[from] ProviderError),

  /// Embedding lengths differ inside a collection
  #[error("embedding dimension mismatch for document {id}: expected {expected}, got {actual}")]
  DimensionMismatch { id: String, expected: usize, actual: usize },

  /// Fewer embeddings came back than documents were submitted
  #[error("Embedding generation failed: expected {expected}, got {actual}")]
  PartialResult { expected: usize, actual: usize },

  /// No history rows could be loaded from any source
  #[error("No data found to index")]
  NoData,

  /// Local file access failed
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// Any failure inside the RAG query pipeline
  #[error("RAG query failed: {0}")]
  RagQuery(#[source] Box<ViewlogError>),
}

impl ViewlogError {
  /// Whether the error was caused by the caller's input rather than the system
  pub fn is_client_error(&self) -> bool {
    match self {
      Self::Validation(_) | Self::EmptyInput | Self::InvalidQuery(_) | Self::NoData => true,
      Self::RagQuery(inner) => inner.is_client_error(),
      _ => false,
    }
  }

  /// Stable key used in API error payloads
  pub fn key(&self) -> &'static str {
    match self {
      Self::Configuration(_) => "configuration_error",
      Self::Validation(_) => "validation_error",
      Self::EmptyInput => "empty_input",
      Self::InvalidQuery(_) => "invalid_query",
      Self::Embedding(_) => "embedding_provider_error",
      Self::Provider(ProviderError::PayloadTooLarge(_)) => "payload_too_large",
      Self::Provider(_) => "provider_error",
      Self::DimensionMismatch { .. } => "dimension_mismatch",
      Self::PartialResult { .. } => "partial_result",
      Self::NoData => "no_data",
      Self::Io(_) => "io_error",
      Self::RagQuery(_) => "rag_query_failed",
    }
  }
}

pub type Result<T, E = ViewlogError> = std::result::Result<T, E>;
