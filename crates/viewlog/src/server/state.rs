//! Shared application state handed to every handler

use std::sync::Arc;

use crate::config::Settings;
use crate::error::Result;
use crate::history::HistorySource;
use crate::server::services::chroma::ChromaCloud;
use crate::server::services::completion::CompletionProvider;
use crate::server::services::embeddings::{EmbeddingClient, EmbeddingProvider};
use crate::server::services::gemini::GeminiClient;
use crate::server::services::http::ProviderHttp;
use crate::server::services::indexing::IndexingPipeline;
use crate::server::services::rag::RagPipeline;
use crate::server::services::vector_store::{CollectionBackend, VectorStoreClient};

#[derive(Clone)]
pub struct AppState {
  pub embeddings: Arc<EmbeddingClient>,
  pub store: Arc<VectorStoreClient>,
  pub indexing: Arc<IndexingPipeline>,
  pub rag: Arc<RagPipeline>,
}

impl AppState {
  /// Wire the hosted Gemini and Chroma providers from settings.
  ///
  /// Credentials are not checked here; a missing key surfaces as a
  /// configuration error on the first request that needs it.
  pub fn from_settings(settings: &Settings) -> Result<Self> {
    let http = ProviderHttp::new(&settings.http)?;
    let gemini = Arc::new(GeminiClient::new(http.clone(), settings.gemini.clone()));
    let chroma = Arc::new(ChromaCloud::new(http, settings.chroma.clone()));

    Ok(Self::from_providers(settings, gemini.clone(), gemini, chroma))
  }

  /// Wire arbitrary providers; used by tests with in-memory fakes
  pub fn from_providers(
    settings: &Settings,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    completion: Arc<dyn CompletionProvider>,
    backend: Arc<dyn CollectionBackend>,
  ) -> Self {
    let embeddings = Arc::new(EmbeddingClient::new(
      embedding_provider,
      settings.gemini.embedding_model.clone(),
      settings.gemini.fallback_embedding_model.clone(),
    ));
    let store = Arc::new(VectorStoreClient::new(backend, settings.chroma.collection.clone()));
    let indexing = Arc::new(IndexingPipeline::new(
      embeddings.clone(),
      store.clone(),
      HistorySource::from(&settings.history),
    ));
    let rag = Arc::new(RagPipeline::new(embeddings.clone(), store.clone(), completion));

    Self { embeddings, store, indexing, rag }
  }
}
