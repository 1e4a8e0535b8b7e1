//! Gemini REST API provider for embeddings and completions

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Response;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::debug;

use crate::config::GeminiSettings;
use crate::error::{ProviderError, Result};
use crate::server::services::completion::{
  CompletionProvider, CompletionStream, GenerationConfig, STREAM_BUFFER,
};
use crate::server::services::embeddings::EmbeddingProvider;
use crate::server::services::http::ProviderHttp;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
  http: ProviderHttp,
  settings: GeminiSettings,
}

impl GeminiClient {
  pub fn new(http: ProviderHttp, settings: GeminiSettings) -> Self {
    Self { http, settings }
  }

  fn generation_config(&self) -> GenerationConfig {
    GenerationConfig {
      temperature: self.settings.temperature,
      max_output_tokens: self.settings.max_output_tokens,
    }
  }

  fn model_url(&self, model: &str, method: &str) -> String {
    format!("{}/{}:{method}", self.settings.base_url, model_resource(model))
  }

  async fn generate(&self, prompt: &str, method: &str, streamed: bool) -> Result<Response> {
    let api_key = self.settings.require_api_key()?;
    let url = self.model_url(&self.settings.generation_model, method);
    let body = generation_body(prompt, self.generation_config());
    let build = |client: &reqwest::Client| client.post(&url).header(API_KEY_HEADER, api_key).json(&body);

    let response = if streamed { self.http.send_streaming(build).await? } else { self.http.send(build).await? };
    Ok(response)
  }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
  async fn embed_text(&self, model: &str, text: &str) -> Result<Vec<f32>> {
    let api_key = self.settings.require_api_key()?;
    let url = self.model_url(model, "embedContent");
    let body = json!({ "model": model_resource(model), "content": { "parts": [{ "text": text }] } });

    let response: Value = self
      .http
      .send_json(|client| client.post(&url).header(API_KEY_HEADER, api_key).json(&body))
      .await
      .map_err(|e| match e {
        ProviderError::NotFound(message) => ProviderError::ModelNotFound(message),
        other => other,
      })?;

    Ok(embedding_values(&response)?)
  }

  fn check_configured(&self) -> Result<()> {
    self.settings.require_api_key().map(|_| ())
  }
}

#[async_trait]
impl CompletionProvider for GeminiClient {
  async fn complete(&self, prompt: &str) -> Result<String> {
    let response = self.generate(prompt, "generateContent", false).await?;
    let body: Value = response.json().await.map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(candidate_text(&body).unwrap_or_default())
  }

  async fn stream(&self, prompt: &str) -> Result<CompletionStream> {
    let response = self.generate(prompt, "streamGenerateContent?alt=sse", true).await?;
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    tokio::spawn(forward_events(response, tx, self.http.idle_timeout()));
    Ok(rx)
  }
}

/// Relay SSE chunks from the provider until it finishes, fails, goes quiet
/// for longer than `idle`, or the consumer leaves
async fn forward_events(
  response: Response,
  tx: mpsc::Sender<std::result::Result<String, ProviderError>>,
  idle: Duration,
) {
  let mut events = Box::pin(response.bytes_stream().eventsource());

  loop {
    let next = tokio::select! {
      _ = tx.closed() => {
        debug!("Completion consumer closed the stream; dropping provider connection");
        return;
      }
      next = timeout(idle, events.next()) => next,
    };

    let item = match next {
      Err(_) => Err(ProviderError::Transport(format!("completion stream idle for {idle:?}"))),
      Ok(None) => return,
      Ok(Some(Ok(event))) => match parse_stream_chunk(&event.data) {
        Ok(Some(text)) => Ok(text),
        Ok(None) => continue,
        Err(e) => Err(e),
      },
      Ok(Some(Err(e))) => Err(ProviderError::Transport(e.to_string())),
    };

    let failed = item.is_err();
    if tx.send(item).await.is_err() || failed {
      return;
    }
  }
}

/// Resource name of a model, `models/{id}`, whichever form was configured
fn model_resource(model: &str) -> String {
  if model.starts_with("models/") {
    model.to_string()
  } else {
    format!("models/{model}")
  }
}

fn generation_body(prompt: &str, config: GenerationConfig) -> Value {
  json!({
    "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
    "generationConfig": {
      "temperature": config.temperature,
      "maxOutputTokens": config.max_output_tokens
    }
  })
}

/// Accepts both `{embedding: {values: [...]}}` and a bare `{embedding: [...]}`
fn embedding_values(response: &Value) -> std::result::Result<Vec<f32>, ProviderError> {
  let values = response
    .pointer("/embedding/values")
    .or_else(|| response.get("embedding").filter(|v| v.is_array()))
    .and_then(Value::as_array)
    .ok_or_else(|| ProviderError::Decode("Unexpected embedding response structure".to_string()))?;

  values
    .iter()
    .map(|v| v.as_f64().map(|f| f as f32))
    .collect::<Option<Vec<f32>>>()
    .ok_or_else(|| ProviderError::Decode("embedding contains non-numeric values".to_string()))
}

/// Concatenated text of the first candidate's parts
fn candidate_text(response: &Value) -> Option<String> {
  let parts = response.pointer("/candidates/0/content/parts")?.as_array()?;
  let text: String = parts.iter().filter_map(|p| p.get("text").and_then(Value::as_str)).collect();
  Some(text)
}

fn parse_stream_chunk(data: &str) -> std::result::Result<Option<String>, ProviderError> {
  let data = data.trim();
  if data.is_empty() || data == "[DONE]" {
    return Ok(None);
  }

  let chunk: Value = serde_json::from_str(data).map_err(|e| ProviderError::Decode(e.to_string()))?;
  if let Some(message) = chunk.pointer("/error/message").and_then(Value::as_str) {
    return Err(ProviderError::Status { status: 500, message: message.to_string() });
  }
  Ok(candidate_text(&chunk).filter(|text| !text.is_empty()))
}
