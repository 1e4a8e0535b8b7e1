//! Health, version and API description endpoints

use axum::response::Json;
use schemars::schema_for;
use serde_json::json;
use uuid::Uuid;

use crate::server::types::{
  ApiInfoResponse, ApiVersions, BaseResponse, EmbedBatchRequest, EmbedRequest, HealthResponse, IndexRequest,
  SearchRequest, VersionResponse,
};

/// GET /health - Liveness check; needs no provider configuration
pub async fn health() -> Json<BaseResponse<HealthResponse>> {
  let response = HealthResponse { status: "ok".to_string(), message: "Server is running".to_string() };
  Json(BaseResponse::success(response, Uuid::new_v4()))
}

/// GET /version - Returns current API version
pub async fn version() -> Json<BaseResponse<VersionResponse>> {
  let response = VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() };
  Json(BaseResponse::success(response, Uuid::new_v4()))
}

/// GET /api - Returns API information and request schemas
pub async fn api_info() -> Json<BaseResponse<ApiInfoResponse>> {
  let version = env!("CARGO_PKG_VERSION");
  let response = ApiInfoResponse {
    latest: version.to_string(),
    versions: ApiVersions { latest: version.to_string(), active: vec![version.to_string()] },
    schemas: json!({
      "POST /embed": schema_for!(EmbedRequest),
      "POST /embed/batch": schema_for!(EmbedBatchRequest),
      "POST /index": schema_for!(IndexRequest),
      "POST /search": schema_for!(SearchRequest),
    }),
  };

  Json(BaseResponse::success(response, Uuid::new_v4()))
}
