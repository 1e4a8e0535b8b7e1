//! REST API module for the viewing-history service
//!
//! HTTP endpoints over the indexing and RAG pipelines. Uses axum for routing
//! and schemars for request schema documentation.

pub mod handlers;
pub mod middleware;
pub mod routing;
pub mod services;
pub mod startup;
pub mod state;
pub mod types;
