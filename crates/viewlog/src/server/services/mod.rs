//! Provider clients and the pipelines built on them

pub mod chroma;
pub mod completion;
pub mod embeddings;
pub mod gemini;
pub mod http;
pub mod indexing;
pub mod rag;
pub mod vector_store;
