//! REST API types with schemars annotations for schema generation

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ViewlogError;
use crate::server::services::rag::SourceEntry;

// Base Response Structure
// ======================

/// Base response object for all API endpoints
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BaseResponse<T> {
  /// API versioning information
  pub versioning: VersionInfo,

  /// Transaction ID for logging correlation
  pub transaction_id: Uuid,

  /// Optional error information
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub errors: Vec<ApiError>,

  /// Response data, flattened into the top level
  #[serde(flatten)]
  pub data: T,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionInfo {
  pub latest: String,
  pub requested: String,
  pub resolved: String,
}

impl VersionInfo {
  fn current() -> Self {
    let version = env!("CARGO_PKG_VERSION").to_string();
    Self { latest: version.clone(), requested: version.clone(), resolved: version }
  }
}

/// API error information
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ApiError {
  /// Error key, unique to the error source
  pub key: String,

  /// Human readable error message
  pub message: String,

  /// Chain of underlying causes, outermost first
  #[serde(default)]
  pub stack: Vec<String>,

  #[serde(default)]
  pub context: Value,
}

// Status/Version Endpoints
// =======================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
  pub status: String,
  pub message: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  pub version: String,
}

/// Response for /api endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiInfoResponse {
  pub latest: String,
  pub versions: ApiVersions,
  /// JSON Schemas of the request bodies, keyed by route
  pub schemas: Value,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiVersions {
  pub latest: String,
  pub active: Vec<String>,
}

// Embedding Endpoints
// ===================

/// Request for POST /embed
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EmbedRequest {
  /// Text to embed
  #[serde(default)]
  pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EmbedResponse {
  pub embedding: Vec<f32>,
}

/// Request for POST /embed/batch
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmbedBatchRequest {
  #[serde(default)]
  pub texts: Option<Vec<String>>,

  /// Texts embedded concurrently per batch (default 10, also used for 0)
  #[serde(default)]
  pub batch_size: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EmbedBatchResponse {
  /// Successful embeddings in input order; failed items are dropped
  pub embeddings: Vec<Vec<f32>>,
}

// Indexing Endpoints
// ==================

/// Request for POST /index (the body itself is optional)
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct IndexRequest {
  /// Delete all existing documents first
  #[serde(default)]
  pub clear: bool,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndexResponse {
  pub success: bool,
  pub indexed: usize,
  pub total_in_collection: usize,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IndexStatusResponse {
  pub count: usize,
}

// Search Endpoint
// ===============

/// Request for POST /search
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
  /// Natural-language question
  #[serde(default)]
  pub query: Option<String>,

  /// Number of history entries to retrieve (default 10, also used for 0)
  #[serde(default)]
  pub n_results: Option<usize>,

  /// Metadata filter, e.g. `{"profile": 2}`
  #[serde(default, rename = "where")]
  pub filter: Option<Value>,

  /// Answer as a server-sent event stream
  #[serde(default)]
  pub stream: bool,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
  pub answer: String,
  pub sources: Vec<SourceEntry>,
  pub relevant_entries: Vec<SourceEntry>,
}

/// Payload of one server-sent event on a streamed search
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SearchEvent {
  Sources(Vec<SourceEntry>),
  Chunk(String),
  Done,
  Error(String),
}

// Helper Functions
// ================

impl<T> BaseResponse<T> {
  pub fn success(data: T, transaction_id: Uuid) -> Self {
    Self { versioning: VersionInfo::current(), transaction_id, errors: Vec::new(), data }
  }

  pub fn error(errors: Vec<ApiError>, transaction_id: Uuid) -> BaseResponse<()> {
    BaseResponse { versioning: VersionInfo::current(), transaction_id, errors, data: () }
  }
}

impl ApiError {
  pub fn new(key: &str, message: &str) -> Self {
    Self { key: key.to_string(), message: message.to_string(), stack: Vec::new(), context: Value::Null }
  }
}

impl From<&ViewlogError> for ApiError {
  fn from(error: &ViewlogError) -> Self {
    let mut stack = Vec::new();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
      stack.push(cause.to_string());
      source = cause.source();
    }

    Self { stack, ..Self::new(error.key(), &error.to_string()) }
  }
}
