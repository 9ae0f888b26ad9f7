//! LLM provider domain models and traits

mod error;
mod message;
mod preset;
mod provider;
mod request;
mod response;
mod target;

pub use error::ProviderError;
pub use message::{Message, MessageRole};
pub use preset::{ProviderPreset, ProviderPresets};
pub use provider::{ChunkStream, ProviderClient};
pub use request::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, GenerationRequest};
pub use response::{ModelInfo, StreamChunk};
pub use target::{DEFAULT_REQUEST_TIMEOUT, Target};

#[cfg(test)]
pub use provider::mock::{MockFailure, MockProviderClient};
