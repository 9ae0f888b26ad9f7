//! Fallback router - tries the targets of a chain strictly in order

use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, future, stream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, warn};

use super::entity::{CommittedStream, FallbackAttempt, FallbackChain, FallbackOutcome};
use super::error::RouterError;
use crate::domain::llm::{
    ChunkStream, GenerationRequest, ProviderClient, ProviderError, StreamChunk,
};

pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// Configuration for the fallback router
#[derive(Debug, Clone)]
pub struct FallbackRouterConfig {
    /// Fixed pause between two consecutive targets
    pub fallback_delay: Duration,
    /// Capacity of the channel feeding streamed chunks to a consumer
    pub stream_buffer: usize,
}

impl Default for FallbackRouterConfig {
    fn default() -> Self {
        Self {
            fallback_delay: DEFAULT_FALLBACK_DELAY,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}

impl FallbackRouterConfig {
    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    pub fn with_stream_buffer(mut self, capacity: usize) -> Self {
        self.stream_buffer = capacity.max(1);
        self
    }
}

/// Fallback router over a shared provider client.
///
/// Stateless beyond its construction arguments, so one router can serve
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct FallbackRouter {
    client: Arc<dyn ProviderClient>,
    config: FallbackRouterConfig,
    span: Span,
}

impl FallbackRouter {
    pub fn new(client: Arc<dyn ProviderClient>, config: FallbackRouterConfig) -> Self {
        Self {
            client,
            config,
            span: tracing::info_span!("fallback_router"),
        }
    }

    /// Use the given span for all log events emitted by this router
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &FallbackRouterConfig {
        &self.config
    }

    /// Run a whole-response request, returning the first successful result
    pub async fn generate(
        &self,
        chain: &FallbackChain,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<FallbackOutcome<String>, RouterError> {
        self.route_generate(chain, request, cancel)
            .instrument(self.span.clone())
            .await
    }

    /// Open a stream on the first target that yields a chunk.
    ///
    /// Targets failing before their first chunk are skipped. Once a chunk
    /// arrives the target is committed and later failures end the stream with
    /// [`RouterError::StreamInterrupted`].
    pub async fn generate_stream(
        &self,
        chain: &FallbackChain,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<CommittedStream, RouterError> {
        self.route_stream(chain, request, cancel)
            .instrument(self.span.clone())
            .await
    }

    /// Drive a streaming request on its own task and deliver items through a
    /// bounded channel.
    ///
    /// A slow consumer applies backpressure to the producer; cancellation
    /// unblocks it and is reported as a final [`RouterError::Cancelled`] item
    /// when the channel has room for it.
    pub fn spawn_stream(
        &self,
        chain: FallbackChain,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> ReceiverStream<Result<StreamChunk, RouterError>> {
        let (tx, rx) = mpsc::channel(self.config.stream_buffer.max(1));
        let router = self.clone();
        let span = self.span.clone();

        tokio::spawn(
            async move {
                let mut stream = match router.route_stream(&chain, &request, &cancel).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };

                loop {
                    let item = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            let _ = tx.try_send(Err(RouterError::Cancelled));
                            break;
                        }
                        item = stream.next() => item,
                    };

                    let Some(item) = item else {
                        break;
                    };

                    let terminal = item.is_err();
                    let delivered = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => false,
                        sent = tx.send(item) => sent.is_ok(),
                    };

                    if !delivered || terminal {
                        break;
                    }
                }

                debug!("Stream producer finished");
            }
            .instrument(span),
        );

        ReceiverStream::new(rx)
    }

    async fn route_generate(
        &self,
        chain: &FallbackChain,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<FallbackOutcome<String>, RouterError> {
        let mut failures = Vec::new();
        let mut last_error = None;

        for (index, target) in chain.iter().enumerate() {
            if index > 0 {
                self.pause(cancel).await?;
            }

            let target_id = target.id();
            debug!(attempt = index + 1, target_id = %target_id, "Trying target");

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RouterError::Cancelled),
                result = self.client.generate(target, request) => result,
            };

            match result {
                Ok(text) => {
                    info!(
                        target_id = %target_id,
                        failed_attempts = failures.len(),
                        "Generation succeeded"
                    );

                    return Ok(FallbackOutcome {
                        value: text,
                        target_id,
                        failures,
                    });
                }
                Err(error) => {
                    record_failure(index, target_id, error, &mut failures, &mut last_error);
                }
            }
        }

        Err(exhausted(chain.len(), failures, last_error))
    }

    async fn route_stream(
        &self,
        chain: &FallbackChain,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<CommittedStream, RouterError> {
        let mut failures = Vec::new();
        let mut last_error = None;

        for (index, target) in chain.iter().enumerate() {
            if index > 0 {
                self.pause(cancel).await?;
            }

            let target_id = target.id();
            debug!(attempt = index + 1, target_id = %target_id, "Opening stream");

            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RouterError::Cancelled),
                result = self.client.generate_stream(target, request) => result,
            };

            let mut stream = match opened {
                Ok(stream) => stream,
                Err(error) => {
                    record_failure(index, target_id, error, &mut failures, &mut last_error);
                    continue;
                }
            };

            let first = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RouterError::Cancelled),
                item = stream.next() => item,
            };

            match first {
                Some(Ok(chunk)) => {
                    info!(
                        target_id = %target_id,
                        failed_attempts = failures.len(),
                        "Stream committed to target"
                    );

                    let items = commit(target_id.clone(), chunk, stream);
                    return Ok(CommittedStream::new(target_id, failures, items));
                }
                Some(Err(error)) => {
                    record_failure(index, target_id, error, &mut failures, &mut last_error);
                }
                None => {
                    let error = ProviderError::malformed(&target_id, "Stream ended before any data");
                    record_failure(index, target_id, error, &mut failures, &mut last_error);
                }
            }
        }

        Err(exhausted(chain.len(), failures, last_error))
    }

    async fn pause(&self, cancel: &CancellationToken) -> Result<(), RouterError> {
        let delay = self.config.fallback_delay;

        if delay.is_zero() {
            return if cancel.is_cancelled() {
                Err(RouterError::Cancelled)
            } else {
                Ok(())
            };
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RouterError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

fn record_failure(
    index: usize,
    target_id: String,
    error: ProviderError,
    failures: &mut Vec<FallbackAttempt>,
    last_error: &mut Option<(String, ProviderError)>,
) {
    warn!(
        attempt = index + 1,
        target_id = %target_id,
        error = %error,
        "Target failed, falling back"
    );

    failures.push(FallbackAttempt::from_error(&target_id, &error));
    *last_error = Some((target_id, error));
}

fn exhausted(
    chain_len: usize,
    failures: Vec<FallbackAttempt>,
    last_error: Option<(String, ProviderError)>,
) -> RouterError {
    match last_error {
        Some((last_target, last_error)) => {
            warn!(chain_len, "All providers exhausted");
            RouterError::AllProvidersExhausted {
                chain_len,
                last_target,
                last_error,
                failures,
            }
        }
        None => RouterError::InvalidChain,
    }
}

/// Prepend the already-received first chunk and map later provider errors to
/// a single terminal `StreamInterrupted` item.
fn commit(
    target_id: String,
    first: StreamChunk,
    rest: ChunkStream,
) -> std::pin::Pin<Box<dyn futures::Stream<Item = Result<StreamChunk, RouterError>> + Send>> {
    let items = stream::once(future::ready(Ok(first))).chain(rest);

    Box::pin(items.scan(
        (0usize, false),
        move |state: &mut (usize, bool), item: Result<StreamChunk, ProviderError>| {
            let (delivered, failed) = state;

            if *failed {
                return future::ready(None);
            }

            let next = match item {
                Ok(chunk) => {
                    *delivered += 1;
                    Ok(chunk)
                }
                Err(source) => {
                    *failed = true;
                    Err(RouterError::StreamInterrupted {
                        target: target_id.clone(),
                        chunks_delivered: *delivered,
                        source,
                    })
                }
            };

            future::ready(Some(next))
        },
    ))
}
