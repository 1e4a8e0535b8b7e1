//! Command-line client for a running viewlog server

pub mod client;
pub mod commands;
pub mod display;
