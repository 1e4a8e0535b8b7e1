//! Shared HTTP plumbing for hosted providers
//!
//! Every provider request goes through `ProviderHttp`, which applies the
//! configured timeout, retries transient failures with exponential backoff
//! and turns non-success answers into classified `ProviderError`s.
//!
//! Plain requests get the timeout as a deadline for the whole exchange.
//! Streamed requests only bound the wait for response headers; the body is
//! read under a per-chunk idle limit by the caller (`idle_timeout`).

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::HttpSettings;
use crate::error::ProviderError;

const BASE_BACKOFF_MS: u64 = 250;

#[derive(Debug, Clone)]
pub struct ProviderHttp {
  client: Client,
  timeout: Duration,
  max_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyMode {
  /// Deadline covers the whole exchange, body included
  Buffered,
  /// Deadline covers the response headers only
  Streamed,
}

impl ProviderHttp {
  pub fn new(settings: &HttpSettings) -> Result<Self, ProviderError> {
    let client = Client::builder()
      .connect_timeout(settings.timeout)
      .build()
      .map_err(|e| ProviderError::Transport(format!("Failed to create HTTP client: {e}")))?;

    Ok(Self { client, timeout: settings.timeout, max_attempts: settings.max_attempts.max(1) })
  }

  pub fn client(&self) -> &Client {
    &self.client
  }

  /// Longest silence tolerated between chunks of a streamed body
  pub fn idle_timeout(&self) -> Duration {
    self.timeout
  }

  /// Send a request built by `build`, retrying transient failures.
  ///
  /// `build` is called once per attempt since request builders are single-use.
  pub async fn send<F>(&self, build: F) -> Result<Response, ProviderError>
  where
    F: Fn(&Client) -> RequestBuilder,
  {
    self.send_with(&build, BodyMode::Buffered).await
  }

  /// Like `send`, for responses whose body is read as a stream.
  ///
  /// The returned response has no overall deadline; read it under
  /// `idle_timeout`.
  pub async fn send_streaming<F>(&self, build: F) -> Result<Response, ProviderError>
  where
    F: Fn(&Client) -> RequestBuilder,
  {
    self.send_with(&build, BodyMode::Streamed).await
  }

  async fn send_with<F>(&self, build: &F, mode: BodyMode) -> Result<Response, ProviderError>
  where
    F: Fn(&Client) -> RequestBuilder,
  {
    let mut attempt = 1;
    loop {
      match self.send_once(build, mode).await {
        Ok(response) => return Ok(response),
        Err(e) if e.is_transient() && attempt < self.max_attempts => {
          let delay = Duration::from_millis(BASE_BACKOFF_MS << (attempt - 1));
          warn!("Provider request failed (attempt {attempt}/{}): {e}; retrying in {delay:?}", self.max_attempts);
          sleep(delay).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  /// Send and decode a JSON response body
  pub async fn send_json<T, F>(&self, build: F) -> Result<T, ProviderError>
  where
    T: DeserializeOwned,
    F: Fn(&Client) -> RequestBuilder,
  {
    let response = self.send(build).await?;
    response.json::<T>().await.map_err(|e| ProviderError::Decode(e.to_string()))
  }

  async fn send_once<F>(&self, build: &F, mode: BodyMode) -> Result<Response, ProviderError>
  where
    F: Fn(&Client) -> RequestBuilder,
  {
    let request = build(&self.client);
    let response = match mode {
      BodyMode::Buffered => request.timeout(self.timeout).send().await.map_err(ProviderError::from)?,
      BodyMode::Streamed => timeout(self.timeout, request.send())
        .await
        .map_err(|_| ProviderError::Transport(format!("no response within {:?}", self.timeout)))?
        .map_err(ProviderError::from)?,
    };
    let status = response.status();
    debug!("Provider responded with {status} for {}", response.url().path());

    if status.is_success() {
      return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::from_status(status.as_u16(), error_message(&body, status.as_u16())))
  }
}

/// Pull a human-readable message out of a provider error body.
///
/// Gemini nests `{error: {message}}`, Chroma uses `{error, message}`.
pub fn error_message(body: &str, status: u16) -> String {
  let Ok(json) = serde_json::from_str::<Value>(body) else {
    return if body.trim().is_empty() { format!("HTTP {status}") } else { body.trim().to_string() };
  };

  let nested = json.pointer("/error/message").and_then(Value::as_str);
  let flat = json.get("message").and_then(Value::as_str);
  let bare = json.get("error").and_then(Value::as_str);

  match (nested, flat, bare) {
    (Some(message), _, _) => message.to_string(),
    (None, Some(message), Some(kind)) => format!("{kind}: {message}"),
    (None, Some(message), None) => message.to_string(),
    (None, None, Some(kind)) => kind.to_string(),
    (None, None, None) => json.to_string(),
  }
}
