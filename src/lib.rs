//! PMP Codegen
//!
//! AI code generation over OpenAI-compatible providers with:
//! - Ordered provider fallback for whole and streamed responses
//! - Buffered SSE decoding with cancellation and backpressure
//! - A plugin registry and manager for template and model catalogs

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
