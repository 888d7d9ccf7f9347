//! `mediaq-agent` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod client;
pub mod collector;
pub mod config;
pub mod executor;
pub mod runner;
