//! HTTP client for the viewlog REST API
//!
//! Thin wrapper the CLI uses to talk to a local or remote viewlog server.

use std::pin::Pin;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use eventsource_stream::Eventsource;
use futures::{stream, Stream, StreamExt};
use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};

use crate::server::types::{
  BaseResponse, EmbedRequest, EmbedResponse, HealthResponse, IndexRequest, IndexResponse, IndexStatusResponse,
  SearchEvent, SearchRequest, SearchResponse,
};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3001";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Indexing and streamed answers outlive the normal request timeout
const LONG_REQUEST_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub type SearchEventStream = Pin<Box<dyn Stream<Item = Result<SearchEvent>> + Send>>;

#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// Base URL of the viewlog server (e.g., "http://localhost:3001")
  pub base_url: String,
  pub timeout_secs: u64,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self { base_url: DEFAULT_SERVER_URL.to_string(), timeout_secs: DEFAULT_TIMEOUT_SECS }
  }
}

pub struct ViewlogClient {
  client: Client,
  config: ClientConfig,
}

impl ViewlogClient {
  pub fn with_config(config: ClientConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .context("Failed to create HTTP client")?;

    Ok(Self { client, config })
  }

  pub fn base_url(&self) -> &str {
    &self.config.base_url
  }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.config.base_url.trim_end_matches('/'))
  }

  pub async fn health(&self) -> Result<HealthResponse> {
    self.execute(self.client.get(self.url("/health")), "Health check failed").await
  }

  pub async fn index_status(&self) -> Result<IndexStatusResponse> {
    self.execute(self.client.get(self.url("/index/status")), "Failed to get index status").await
  }

  pub async fn index(&self, clear: bool) -> Result<IndexResponse> {
    let request = self.client.post(self.url("/index")).json(&IndexRequest { clear }).timeout(LONG_REQUEST_TIMEOUT);
    self.execute(request, "Indexing failed").await
  }

  pub async fn embed(&self, text: &str) -> Result<EmbedResponse> {
    let body = EmbedRequest { text: Some(text.to_string()) };
    self.post_json("/embed", &body, "Failed to generate embedding").await
  }

  pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
    self.post_json("/search", request, "Search failed").await
  }

  /// Search with a streamed answer.
  ///
  /// When the server answers with plain JSON (no matching history), the
  /// answer is replayed as the same event sequence.
  pub async fn search_stream(&self, request: &SearchRequest) -> Result<SearchEventStream> {
    let response = self
      .client
      .post(self.url("/search"))
      .json(request)
      .timeout(LONG_REQUEST_TIMEOUT)
      .send()
      .await
      .with_context(|| format!("Failed to reach viewlog server at {}", self.config.base_url))?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      return Err(failure("Search failed", status.as_u16(), &body));
    }

    let is_event_stream = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|v| v.starts_with("text/event-stream"));

    if !is_event_stream {
      let result: BaseResponse<SearchResponse> = response.json().await?;
      let events = vec![
        Ok(SearchEvent::Sources(result.data.sources)),
        Ok(SearchEvent::Chunk(result.data.answer)),
        Ok(SearchEvent::Done),
      ];
      return Ok(Box::pin(stream::iter(events)));
    }

    let events = response.bytes_stream().eventsource().map(|event| {
      let event = event.map_err(|e| anyhow!("Stream interrupted: {e}"))?;
      serde_json::from_str::<SearchEvent>(&event.data).with_context(|| format!("Malformed event: {}", event.data))
    });
    Ok(Box::pin(events))
  }

  async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
    action: &str,
  ) -> Result<T> {
    self.execute(self.client.post(self.url(path)).json(body), action).await
  }

  async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, action: &str) -> Result<T> {
    let response = request
      .send()
      .await
      .with_context(|| format!("Failed to reach viewlog server at {}", self.config.base_url))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(failure(action, status.as_u16(), &body));
    }

    let result: BaseResponse<T> = response.json().await.with_context(|| format!("{action}: malformed response"))?;
    Ok(result.data)
  }
}

/// Prefer the server's error envelope message over the raw body
fn failure(action: &str, status: u16, body: &str) -> anyhow::Error {
  let message = serde_json::from_str::<BaseResponse<serde_json::Value>>(body)
    .ok()
    .and_then(|envelope| envelope.errors.into_iter().next())
    .map(|error| error.message)
    .unwrap_or_else(|| if body.is_empty() { format!("HTTP {status}") } else { body.to_string() });

  anyhow!("{action}: {message}")
}

/// Build a client from `VIEWLOG_SERVER_URL` and `VIEWLOG_TIMEOUT_SECS`
pub fn get_client() -> Result<ViewlogClient> {
  let base_url = std::env::var("VIEWLOG_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());

  let timeout_secs = std::env::var("VIEWLOG_TIMEOUT_SECS")
    .ok()
    .and_then(|v| v.parse().ok())
    .unwrap_or(DEFAULT_TIMEOUT_SECS);

  ViewlogClient::with_config(ClientConfig { base_url, timeout_secs })
}
