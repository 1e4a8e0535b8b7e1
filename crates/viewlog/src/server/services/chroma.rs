//! Chroma Cloud (v2 REST API) collection backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::config::{ChromaCredentials, ChromaSettings};
use crate::error::{Result, ViewlogError};
use crate::server::services::http::ProviderHttp;
use crate::server::services::vector_store::{
  CollectionBackend, CollectionHandle, DocumentMetadata, IncludeField, IndexedDocument, QueryMatch,
  QueryOptions, QueryResult,
};

const TOKEN_HEADER: &str = "x-chroma-token";

pub struct ChromaCloud {
  http: ProviderHttp,
  settings: ChromaSettings,
}

#[derive(Debug, Deserialize)]
struct ChromaCollection {
  id: String,
  name: String,
  #[serde(default)]
  dimension: Option<usize>,
}

impl From<ChromaCollection> for CollectionHandle {
  fn from(collection: ChromaCollection) -> Self {
    Self { id: collection.id, name: collection.name, dimension: collection.dimension }
  }
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
  ids: Vec<&'a str>,
  embeddings: Vec<&'a [f32]>,
  metadatas: Vec<&'a DocumentMetadata>,
  documents: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
  query_embeddings: [&'a [f32]; 1],
  n_results: usize,
  #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
  filter: Option<&'a Value>,
  include: &'a [IncludeField],
}

/// Column-oriented query answer, one row per query embedding
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
  #[serde(default)]
  ids: Vec<Vec<String>>,
  #[serde(default)]
  documents: Option<Vec<Vec<Option<String>>>>,
  #[serde(default)]
  metadatas: Option<Vec<Vec<Option<Value>>>>,
  #[serde(default)]
  distances: Option<Vec<Vec<Option<f32>>>>,
  #[serde(default)]
  embeddings: Option<Vec<Vec<Vec<f32>>>>,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
  #[serde(default)]
  ids: Vec<String>,
}

impl ChromaCloud {
  pub fn new(http: ProviderHttp, settings: ChromaSettings) -> Self {
    Self { http, settings }
  }

  /// `{base}/api/v2/tenants/{tenant}/databases/{database}/collections/{segments...}`
  fn collections_url(&self, credentials: &ChromaCredentials<'_>, segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(&self.settings.base_url)
      .map_err(|e| ViewlogError::Configuration(format!("CHROMA_BASE_URL is invalid: {e}")))?;

    url
      .path_segments_mut()
      .map_err(|_| ViewlogError::Configuration("CHROMA_BASE_URL cannot be a base URL".to_string()))?
      .pop_if_empty()
      .extend(["api", "v2", "tenants", credentials.tenant, "databases", credentials.database, "collections"])
      .extend(segments);

    Ok(url.to_string())
  }
}

#[async_trait]
impl CollectionBackend for ChromaCloud {
  async fn get_collection(&self, name: &str) -> Result<CollectionHandle> {
    let credentials = self.settings.require_credentials()?;
    let url = self.collections_url(&credentials, &[name])?;

    let collection: ChromaCollection = self
      .http
      .send_json(|client| client.get(&url).header(TOKEN_HEADER, credentials.api_key))
      .await?;
    Ok(collection.into())
  }

  async fn create_collection(&self, name: &str, metadata: &Value) -> Result<CollectionHandle> {
    let credentials = self.settings.require_credentials()?;
    let url = self.collections_url(&credentials, &[])?;
    let body = json!({ "name": name, "metadata": metadata, "get_or_create": true });

    let collection: ChromaCollection = self
      .http
      .send_json(|client| client.post(&url).header(TOKEN_HEADER, credentials.api_key).json(&body))
      .await?;
    Ok(collection.into())
  }

  async fn upsert(&self, collection: &CollectionHandle, documents: &[IndexedDocument]) -> Result<()> {
    let credentials = self.settings.require_credentials()?;
    let url = self.collections_url(&credentials, &[collection.id.as_str(), "upsert"])?;
    let body = UpsertRequest {
      ids: documents.iter().map(|d| d.id.as_str()).collect(),
      embeddings: documents.iter().map(|d| d.embedding.as_slice()).collect(),
      metadatas: documents.iter().map(|d| &d.metadata).collect(),
      documents: documents.iter().map(|d| d.text.as_str()).collect(),
    };

    self
      .http
      .send(|client| client.post(&url).header(TOKEN_HEADER, credentials.api_key).json(&body))
      .await?;
    Ok(())
  }

  async fn query(
    &self,
    collection: &CollectionHandle,
    embedding: &[f32],
    options: &QueryOptions,
  ) -> Result<QueryResult> {
    let credentials = self.settings.require_credentials()?;
    let url = self.collections_url(&credentials, &[collection.id.as_str(), "query"])?;
    let body = QueryRequest {
      query_embeddings: [embedding],
      n_results: options.n_results,
      filter: options.filter.as_ref(),
      include: &options.include,
    };

    let response: QueryResponse = self
      .http
      .send_json(|client| client.post(&url).header(TOKEN_HEADER, credentials.api_key).json(&body))
      .await?;
    Ok(first_row(response))
  }

  async fn count(&self, collection: &CollectionHandle) -> Result<usize> {
    let credentials = self.settings.require_credentials()?;
    let url = self.collections_url(&credentials, &[collection.id.as_str(), "count"])?;

    let count: usize = self
      .http
      .send_json(|client| client.get(&url).header(TOKEN_HEADER, credentials.api_key))
      .await?;
    Ok(count)
  }

  async fn list_ids(&self, collection: &CollectionHandle) -> Result<Vec<String>> {
    let credentials = self.settings.require_credentials()?;
    let url = self.collections_url(&credentials, &[collection.id.as_str(), "get"])?;
    let body = json!({ "include": [] });

    let response: GetResponse = self
      .http
      .send_json(|client| client.post(&url).header(TOKEN_HEADER, credentials.api_key).json(&body))
      .await?;
    Ok(response.ids)
  }

  async fn delete(&self, collection: &CollectionHandle, ids: &[String]) -> Result<()> {
    let credentials = self.settings.require_credentials()?;
    let url = self.collections_url(&credentials, &[collection.id.as_str(), "delete"])?;
    let body = json!({ "ids": ids });

    self
      .http
      .send(|client| client.post(&url).header(TOKEN_HEADER, credentials.api_key).json(&body))
      .await?;
    Ok(())
  }
}

/// Flatten the first query row into ordered matches
fn first_row(response: QueryResponse) -> QueryResult {
  fn row<T>(column: Option<Vec<Vec<T>>>) -> Vec<T> {
    column.and_then(|rows| rows.into_iter().next()).unwrap_or_default()
  }

  let ids = response.ids.into_iter().next().unwrap_or_default();
  let mut documents = row(response.documents).into_iter();
  let mut metadatas = row(response.metadatas).into_iter();
  let mut distances = row(response.distances).into_iter();
  let mut embeddings = row(response.embeddings).into_iter();

  let matches = ids
    .into_iter()
    .map(|id| QueryMatch {
      id,
      document: documents.next().flatten(),
      metadata: metadatas.next().flatten(),
      distance: distances.next().flatten(),
      embedding: embeddings.next(),
    })
    .collect();

  QueryResult { matches }
}
