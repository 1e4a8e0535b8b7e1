//! Request context and middleware for the viewlog REST API
//!
//! Every request gets a `RequestContext` in its extensions carrying a
//! request id and the request metadata, and is logged on start and finish.

use std::time::Instant;

use axum::{
  extract::Request,
  http::{HeaderMap, Method, Uri},
  middleware::Next,
  response::Response,
};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RequestContext {
  /// Unique ID for this request, echoed as the response transaction id
  pub request_id: Uuid,
  pub method: Method,
  pub uri: Uri,
  pub headers: HeaderMap,
}

impl RequestContext {
  pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
    Self { request_id: Uuid::new_v4(), method, uri, headers }
  }

  fn user_agent(&self) -> &str {
    self
      .headers
      .get("user-agent")
      .map(|v| v.to_str().unwrap_or("unknown"))
      .unwrap_or("none")
  }

  pub fn log_info(&self, message: &str) {
    info!(request_id = %self.request_id, "{} {} - {message}", self.method, self.uri.path());
  }

  pub fn log_warn(&self, message: &str) {
    warn!(request_id = %self.request_id, "{} {} - {message}", self.method, self.uri.path());
  }

  pub fn log_error(&self, message: &str) {
    error!(request_id = %self.request_id, "{} {} - {message}", self.method, self.uri.path());
  }

  fn log_request_start(&self) {
    info!(
      request_id = %self.request_id,
      user_agent = self.user_agent(),
      "{} {} - Request started",
      self.method,
      self.uri.path()
    );
  }

  fn log_request_complete(&self, status: u16, duration_ms: f64) {
    info!(
      request_id = %self.request_id,
      status,
      "{} {} - Request completed in {duration_ms:.2}ms",
      self.method,
      self.uri.path()
    );
  }
}

/// Middleware to inject RequestContext into all requests
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
  let context = RequestContext::new(request.method().clone(), request.uri().clone(), request.headers().clone());

  let start_time = Instant::now();
  context.log_request_start();
  request.extensions_mut().insert(context.clone());

  let response = next.run(request).await;

  let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
  context.log_request_complete(response.status().as_u16(), duration_ms);

  response
}
