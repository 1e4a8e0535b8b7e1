//! Indexing endpoint handlers

use axum::{
  body::Bytes,
  extract::{Extension, State},
  response::Json as ResponseJson,
};

use crate::error::ViewlogError;
use crate::server::handlers::{error_response, HandlerResult};
use crate::server::middleware::RequestContext;
use crate::server::services::indexing::IndexOptions;
use crate::server::state::AppState;
use crate::server::types::{BaseResponse, IndexRequest, IndexResponse, IndexStatusResponse};

/// POST /index - Index every profile export into the collection
///
/// The JSON body is optional; an empty body indexes without clearing.
pub async fn index(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  body: Bytes,
) -> HandlerResult<IndexResponse> {
  let request = match parse_body(&body) {
    Ok(request) => request,
    Err(e) => return Err(error_response(&context, &e)),
  };

  context.log_info(&format!("Starting indexing (clear: {})", request.clear));

  match state.indexing.run(IndexOptions { clear: request.clear }).await {
    Ok(summary) => {
      context.log_info(&format!(
        "Indexed {} documents, {} in collection",
        summary.indexed, summary.total_in_collection
      ));
      let response = IndexResponse {
        success: true,
        indexed: summary.indexed,
        total_in_collection: summary.total_in_collection,
      };
      Ok(ResponseJson(BaseResponse::success(response, context.request_id)))
    }
    Err(e) => Err(error_response(&context, &e)),
  }
}

/// GET /index/status - Number of documents in the collection
pub async fn index_status(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
) -> HandlerResult<IndexStatusResponse> {
  match state.store.count().await {
    Ok(count) => Ok(ResponseJson(BaseResponse::success(IndexStatusResponse { count }, context.request_id))),
    Err(e) => Err(error_response(&context, &e)),
  }
}

fn parse_body(body: &[u8]) -> Result<IndexRequest, ViewlogError> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return Ok(IndexRequest::default());
  }
  serde_json::from_slice(body).map_err(|e| ViewlogError::Validation(format!("Invalid index request body: {e}")))
}
