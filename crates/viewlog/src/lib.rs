//! Viewlog - Question answering over streaming viewing history
//!
//! Indexes per-profile viewing-history exports into a hosted vector
//! collection and answers natural-language questions about them with
//! retrieval-augmented generation, behind a small REST API and CLI.

pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod server;
