//! Endpoint handlers

pub mod embed;
pub mod index;
pub mod search;
pub mod status;

use axum::{http::StatusCode, response::Json};

use crate::error::ViewlogError;
use crate::server::middleware::RequestContext;
use crate::server::types::{ApiError, BaseResponse};

pub type ErrorResponse = (StatusCode, Json<BaseResponse<()>>);

pub type HandlerResult<T> = Result<Json<BaseResponse<T>>, ErrorResponse>;

/// Render a library error as an API error envelope.
///
/// Caller mistakes map to 400, everything else to 500.
pub fn error_response(context: &RequestContext, error: &ViewlogError) -> ErrorResponse {
  let status = if error.is_client_error() { StatusCode::BAD_REQUEST } else { StatusCode::INTERNAL_SERVER_ERROR };

  if status.is_server_error() {
    context.log_error(&error.to_string());
  } else {
    context.log_warn(&error.to_string());
  }

  (status, Json(BaseResponse::<()>::error(vec![ApiError::from(error)], context.request_id)))
}
