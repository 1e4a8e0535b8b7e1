mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{settings_for, write_export, FakeCompletion, FakeEmbeddings, MemoryCollection};
use viewlog::config::Settings;
use viewlog::server::routing::create_router;
use viewlog::server::state::AppState;

fn app_with(settings: &Settings, embeddings: FakeEmbeddings, completion: FakeCompletion) -> Router {
  let state = AppState::from_providers(
    settings,
    Arc::new(embeddings),
    Arc::new(completion),
    Arc::new(MemoryCollection::existing()),
  );
  create_router(state)
}

fn app(completion: FakeCompletion) -> Router {
  app_with(&Settings::default(), FakeEmbeddings::new(), completion)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
  Request::post(uri).header(header::CONTENT_TYPE, "application/json").body(Body::from(body.to_string())).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
  let response = app.oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  (status, serde_json::from_slice(&bytes).unwrap())
}

/// Index a small export so searches have something to find
async fn indexed_app(completion: FakeCompletion) -> (tempfile::TempDir, Router) {
  let dir = tempfile::tempdir().unwrap();
  write_export(dir.path(), 1, &[("Dark: Season 1: Secrets", "3/14/23"), ("Ozark: Season 2: Episode 3", "4/1/23")]);
  let app = app_with(&settings_for(dir.path()), FakeEmbeddings::new(), completion);

  let (status, body) = send(app.clone(), Request::post("/index").body(Body::empty()).unwrap()).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  (dir, app)
}

#[tokio::test]
async fn health_needs_no_configuration() {
  let app = create_router(AppState::from_settings(&Settings::default()).unwrap());

  let (status, body) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
  assert_eq!(body["message"], "Server is running");
  assert!(body["transaction_id"].is_string());
}

#[tokio::test]
async fn api_info_lists_request_schemas() {
  let (status, body) = send(app(FakeCompletion::answering("")), Request::get("/api").body(Body::empty()).unwrap()).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["latest"], env!("CARGO_PKG_VERSION"));
  assert!(body["schemas"]["POST /search"]["properties"]["nResults"].is_object());
}

#[tokio::test]
async fn embed_without_credentials_is_a_server_error() {
  let app = create_router(AppState::from_settings(&Settings::default()).unwrap());

  let (status, body) = send(app, post_json("/embed", json!({ "text": "Dark" }))).await;

  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["errors"][0]["key"], "configuration_error");
  assert!(body["errors"][0]["message"].as_str().unwrap().contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn embed_validates_text() {
  let (status, body) = send(app(FakeCompletion::answering("")), post_json("/embed", json!({}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["errors"][0]["message"], "Text is required and must be a string");

  let (status, body) = send(app(FakeCompletion::answering("")), post_json("/embed", json!({ "text": "  " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["errors"][0]["key"], "empty_input");
}

#[tokio::test]
async fn embed_batch_drops_failed_items() {
  let app = app_with(&Settings::default(), FakeEmbeddings::new().failing_on("bad"), FakeCompletion::answering(""));

  let (status, body) =
    send(app, post_json("/embed/batch", json!({ "texts": ["Dark", "bad one", "Ozark"], "batchSize": 2 }))).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["embeddings"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn zero_batch_size_uses_the_default() {
  let (status, body) =
    send(app(FakeCompletion::answering("")), post_json("/embed/batch", json!({ "texts": ["Dark"], "batchSize": 0 }))).await;

  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["embeddings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn embed_batch_requires_texts() {
  let (status, body) = send(app(FakeCompletion::answering("")), post_json("/embed/batch", json!({ "texts": [] }))).await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["errors"][0]["key"], "validation_error");
}

#[tokio::test]
async fn index_reports_counts_and_status() {
  let (_dir, app) = indexed_app(FakeCompletion::answering("")).await;

  let (status, body) = send(app.clone(), post_json("/index", json!({ "clear": true }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["success"], true);
  assert_eq!(body["indexed"], 2);
  assert_eq!(body["totalInCollection"], 2);

  let (status, body) = send(app, Request::get("/index/status").body(Body::empty()).unwrap()).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn index_without_exports_is_a_bad_request() {
  let dir = tempfile::tempdir().unwrap();
  let app = app_with(&settings_for(dir.path()), FakeEmbeddings::new(), FakeCompletion::answering(""));

  let (status, body) = send(app, Request::post("/index").body(Body::empty()).unwrap()).await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["errors"][0]["key"], "no_data");
  assert_eq!(body["errors"][0]["message"], "No data found to index");
}

#[tokio::test]
async fn search_rejects_missing_or_blank_query() {
  for request in [json!({}), json!({ "query": "   " })] {
    let (status, body) = send(app(FakeCompletion::answering("")), post_json("/search", request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["key"], "invalid_query");
  }
}

#[tokio::test]
async fn search_returns_answer_and_sources() {
  let (_dir, app) = indexed_app(FakeCompletion::answering("You watched Dark.")).await;

  let (status, body) = send(app, post_json("/search", json!({ "query": "What did I watch?", "nResults": 1 }))).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["answer"], "You watched Dark.");
  assert_eq!(body["sources"].as_array().unwrap().len(), 1);
  assert_eq!(body["sources"], body["relevantEntries"]);
  assert!(body["sources"][0]["mainTitle"].is_string());
}

#[tokio::test]
async fn zero_result_count_uses_the_default() {
  let (_dir, app) = indexed_app(FakeCompletion::answering("You watched Dark.")).await;

  let (status, body) = send(app, post_json("/search", json!({ "query": "What did I watch?", "nResults": 0 }))).await;

  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["sources"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn streamed_search_emits_sources_chunks_and_done() {
  let completion = FakeCompletion::answering("").with_chunks(vec!["You ".to_string(), "watched Dark.".to_string()]);
  let (_dir, app) = indexed_app(completion).await;

  let response = app.oneshot(post_json("/search", json!({ "query": "What did I watch?", "stream": true }))).await.unwrap();
  assert_eq!(response.status(), StatusCode::OK);
  assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/event-stream"));

  let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let events: Vec<Value> = String::from_utf8(body.to_vec())
    .unwrap()
    .lines()
    .filter_map(|line| line.strip_prefix("data: "))
    .map(|data| serde_json::from_str(data).unwrap())
    .collect();

  assert_eq!(events.len(), 4);
  assert_eq!(events[0]["type"], "sources");
  assert_eq!(events[0]["data"].as_array().unwrap().len(), 2);
  assert_eq!(events[1], json!({ "type": "chunk", "data": "You " }));
  assert_eq!(events[2], json!({ "type": "chunk", "data": "watched Dark." }));
  assert_eq!(events[3], json!({ "type": "done" }));
}

#[tokio::test]
async fn streamed_search_reports_provider_failure() {
  let completion = FakeCompletion::answering("").with_chunks(vec!["Partial".to_string()]).failing_stream();
  let (_dir, app) = indexed_app(completion).await;

  let response = app.oneshot(post_json("/search", json!({ "query": "What did I watch?", "stream": true }))).await.unwrap();
  let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let body = String::from_utf8(body.to_vec()).unwrap();

  assert!(body.contains(r#""type":"error""#));
  assert!(body.contains("stream broke"));
  assert!(!body.contains(r#""type":"done""#));
}
