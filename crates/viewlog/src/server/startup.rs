//! REST server startup and configuration

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::serve;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::server::routing::create_router;
use crate::server::state::AppState;

/// Start the REST server and serve until it fails
pub async fn start_server(addr: SocketAddr, settings: Settings) -> Result<()> {
  info!("Starting viewlog REST server on {addr}");
  if settings.gemini.api_key.is_none() {
    warn!("GEMINI_API_KEY is not set; embedding and search requests will fail until it is");
  }

  let state = AppState::from_settings(&settings).context("Failed to initialize providers")?;

  let app = create_router(state)
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()));

  let listener = TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {addr}"))?;
  info!("Server listening on {addr}");

  match serve(listener, app).await {
    Ok(()) => {
      info!("Server shutdown gracefully");
      Ok(())
    }
    Err(e) => {
      error!("Server error: {e}");
      Err(anyhow::anyhow!("Server error: {e}"))
    }
  }
}
