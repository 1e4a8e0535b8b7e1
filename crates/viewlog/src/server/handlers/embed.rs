//! Embedding endpoint handlers

use axum::{
  extract::{Extension, Json, State},
  response::Json as ResponseJson,
};

use crate::error::ViewlogError;
use crate::server::handlers::{error_response, HandlerResult};
use crate::server::middleware::RequestContext;
use crate::server::services::embeddings::DEFAULT_EMBED_BATCH_SIZE;
use crate::server::state::AppState;
use crate::server::types::{BaseResponse, EmbedBatchRequest, EmbedBatchResponse, EmbedRequest, EmbedResponse};

/// POST /embed - Embed a single text
pub async fn embed(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Json(request): Json<EmbedRequest>,
) -> HandlerResult<EmbedResponse> {
  let Some(text) = request.text else {
    let error = ViewlogError::Validation("Text is required and must be a string".to_string());
    return Err(error_response(&context, &error));
  };

  match state.embeddings.embed(&text).await {
    Ok(embedding) => Ok(ResponseJson(BaseResponse::success(EmbedResponse { embedding }, context.request_id))),
    Err(e) => Err(error_response(&context, &e)),
  }
}

/// POST /embed/batch - Embed many texts, dropping the ones that failed
pub async fn embed_batch(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Json(request): Json<EmbedBatchRequest>,
) -> HandlerResult<EmbedBatchResponse> {
  let texts = request.texts.unwrap_or_default();
  // 0 means "unset", like an omitted field
  let batch_size = request.batch_size.filter(|&size| size > 0).unwrap_or(DEFAULT_EMBED_BATCH_SIZE);

  match state.embeddings.embed_batch(&texts, batch_size).await {
    Ok(results) => {
      let embeddings: Vec<Vec<f32>> = results.into_iter().flatten().collect();
      context.log_info(&format!("Embedded {}/{} texts", embeddings.len(), texts.len()));
      Ok(ResponseJson(BaseResponse::success(EmbedBatchResponse { embeddings }, context.request_id)))
    }
    Err(e) => Err(error_response(&context, &e)),
  }
}
