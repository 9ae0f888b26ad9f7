//! LLM provider implementations

mod factory;
mod http_client;
mod openai_compatible;
mod retry;
mod sse;

pub use factory::{FactoryError, LlmClientFactory};
pub use http_client::{ByteStream, HttpClient, HttpClientTrait, HttpError};
pub use openai_compatible::{Attribution, DEFAULT_REFERER, DEFAULT_TITLE, OpenAiCompatibleClient};
pub use retry::RetryPolicy;
pub use sse::{ChunkBuffer, DEFAULT_FLUSH_THRESHOLD, decode_sse};

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
