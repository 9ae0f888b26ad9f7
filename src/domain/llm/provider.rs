use async_trait::async_trait;
use futures::Stream;
use std::fmt::Debug;
use std::pin::Pin;

use super::{GenerationRequest, ModelInfo, ProviderError, StreamChunk, Target};

/// Stream of decoded chunks for one streaming request
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ProviderError>> + Send>>;

/// Client able to issue generation requests against any [`Target`]
#[async_trait]
pub trait ProviderClient: Send + Sync + Debug {
    /// Send a blocking (whole-response) generation request
    async fn generate(
        &self,
        target: &Target,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError>;

    /// Send a streaming generation request.
    ///
    /// Returns once the response headers are in; a non-200 status is reported
    /// here, before any chunk is produced.
    async fn generate_stream(
        &self,
        target: &Target,
        request: &GenerationRequest,
    ) -> Result<ChunkStream, ProviderError>;

    /// List models advertised by the target's provider. Best effort: failures
    /// yield an empty list.
    async fn list_models(&self, target: &Target) -> Vec<ModelInfo>;
}
