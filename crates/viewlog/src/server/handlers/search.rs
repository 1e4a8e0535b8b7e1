//! Search endpoint handler

use std::convert::Infallible;

use axum::{
  extract::{Extension, Json, State},
  response::{
    sse::{Event, KeepAlive, Sse},
    IntoResponse, Json as ResponseJson, Response,
  },
};
use futures::Stream;

use crate::error::ViewlogError;
use crate::server::handlers::{error_response, ErrorResponse};
use crate::server::middleware::RequestContext;
use crate::server::services::completion::CompletionStream;
use crate::server::services::rag::{Answer, RagOptions, SourceEntry};
use crate::server::services::vector_store::DEFAULT_QUERY_RESULTS;
use crate::server::state::AppState;
use crate::server::types::{BaseResponse, SearchEvent, SearchRequest, SearchResponse};

/// POST /search - Answer a question from the viewing history
///
/// Responds with JSON, or with server-sent events when `stream` is set and
/// there were matches to stream an answer about.
pub async fn search(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Json(request): Json<SearchRequest>,
) -> Result<Response, ErrorResponse> {
  let query = match request.query {
    Some(query) if !query.trim().is_empty() => query,
    _ => {
      let error = ViewlogError::InvalidQuery("query is missing or blank".to_string());
      return Err(error_response(&context, &error));
    }
  };

  let options = RagOptions {
    n_results: request.n_results.filter(|&n| n > 0).unwrap_or(DEFAULT_QUERY_RESULTS),
    filter: request.filter,
    stream: request.stream,
  };

  let response = match state.rag.query(&query, options).await {
    Ok(response) => response,
    Err(e) => return Err(error_response(&context, &e)),
  };

  context.log_info(&format!("Answering from {} sources", response.sources.len()));

  match response.answer {
    Answer::Complete(answer) => {
      let data = SearchResponse { answer, relevant_entries: response.sources.clone(), sources: response.sources };
      Ok(ResponseJson(BaseResponse::success(data, context.request_id)).into_response())
    }
    Answer::Stream(chunks) => {
      Ok(Sse::new(search_events(context, response.sources, chunks)).keep_alive(KeepAlive::default()).into_response())
    }
  }
}

/// `sources` first, then one `chunk` per completion chunk, then `done`.
///
/// A provider failure mid-stream ends the stream with an `error` event.
/// The completion producer stops once this stream is dropped.
fn search_events(
  context: RequestContext,
  sources: Vec<SourceEntry>,
  mut chunks: CompletionStream,
) -> impl Stream<Item = Result<Event, Infallible>> {
  async_stream::stream! {
    yield Ok(event(&SearchEvent::Sources(sources)));

    let mut failed = false;
    while let Some(chunk) = chunks.recv().await {
      match chunk {
        Ok(text) => {
          yield Ok(event(&SearchEvent::Chunk(text)));
        }
        Err(e) => {
          context.log_error(&format!("Streaming completion failed: {e}"));
          yield Ok(event(&SearchEvent::Error(e.to_string())));
          failed = true;
          break;
        }
      }
    }

    if !failed {
      yield Ok(event(&SearchEvent::Done));
    }
  }
}

fn event(payload: &SearchEvent) -> Event {
  Event::default().data(serde_json::to_string(payload).unwrap_or_default())
}
