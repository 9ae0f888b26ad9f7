//! SSE decoding of chat-completion streams into buffered text chunks

use std::time::Duration;

use eventsource_stream::{EventStream, EventStreamError};
use futures::{StreamExt, stream};
use serde::Deserialize;
use tracing::{debug, warn};

use super::http_client::{ByteStream, HttpError};
use crate::domain::llm::{ChunkStream, ProviderError, StreamChunk};

pub const DEFAULT_FLUSH_THRESHOLD: usize = 40;

const DONE_MARKER: &str = "[DONE]";

/// Accumulates delta fragments and releases them once the threshold is hit
#[derive(Debug)]
pub struct ChunkBuffer {
    buffer: String,
    threshold: usize,
}

impl ChunkBuffer {
    pub fn new(threshold: usize) -> Self {
        Self {
            buffer: String::new(),
            threshold: threshold.max(1),
        }
    }

    /// Append a fragment; returns a chunk when the buffer reached the threshold
    pub fn push(&mut self, fragment: &str) -> Option<StreamChunk> {
        self.buffer.push_str(fragment);

        if self.buffer.len() >= self.threshold {
            Some(StreamChunk::partial(std::mem::take(&mut self.buffer)))
        } else {
            None
        }
    }

    /// Release buffered text early as a non-final chunk, if there is any
    pub fn flush_partial(&mut self) -> Option<StreamChunk> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(StreamChunk::partial(std::mem::take(&mut self.buffer)))
        }
    }

    /// Drain what is left as the final chunk (possibly empty)
    pub fn finish(&mut self) -> StreamChunk {
        StreamChunk::last(std::mem::take(&mut self.buffer))
    }
}

#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract `choices[0].delta.content` from one `data:` payload
fn parse_delta(data: &str) -> Result<Option<String>, serde_json::Error> {
    let frame: StreamFrame = serde_json::from_str(data)?;

    Ok(frame
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty()))
}

struct DecoderState {
    events: EventStream<ByteStream>,
    buffer: ChunkBuffer,
    target_id: String,
    read_timeout: Duration,
    pending_error: Option<ProviderError>,
    finished: bool,
}

impl DecoderState {
    /// End the stream with `error`, handing out buffered text first
    fn fail(mut self, error: ProviderError) -> Option<(Result<StreamChunk, ProviderError>, Self)> {
        self.finished = true;

        match self.buffer.flush_partial() {
            Some(partial) => {
                self.pending_error = Some(error);
                Some((Ok(partial), self))
            }
            None => Some((Err(error), self)),
        }
    }
}

/// Decode an SSE body into chunks.
///
/// Malformed events are skipped. Each read of the body is bounded by
/// `read_timeout`; a stalled body ends with [`ProviderError::Timeout`]. A
/// transport failure mid-body ends with a single [`ProviderError::Stream`]
/// item, preceded by any text still buffered. Otherwise the stream ends with
/// exactly one final chunk, on `[DONE]` or end of body.
pub fn decode_sse(
    target_id: impl Into<String>,
    body: ByteStream,
    flush_threshold: usize,
    read_timeout: Duration,
) -> ChunkStream {
    let state = DecoderState {
        events: EventStream::new(body),
        buffer: ChunkBuffer::new(flush_threshold),
        target_id: target_id.into(),
        read_timeout,
        pending_error: None,
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        if let Some(error) = state.pending_error.take() {
            return Some((Err(error), state));
        }

        if state.finished {
            return None;
        }

        loop {
            let next = match tokio::time::timeout(state.read_timeout, state.events.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(
                        target_id = %state.target_id,
                        timeout_ms = state.read_timeout.as_millis() as u64,
                        "Stream stalled"
                    );
                    let error = ProviderError::timeout(
                        state.target_id.clone(),
                        state.read_timeout.as_millis() as u64,
                    );
                    return state.fail(error);
                }
            };

            match next {
                Some(Ok(event)) => {
                    let data = event.data.trim();

                    if data == DONE_MARKER {
                        state.finished = true;
                        let last = state.buffer.finish();
                        return Some((Ok(last), state));
                    }

                    match parse_delta(data) {
                        Ok(Some(fragment)) => {
                            if let Some(chunk) = state.buffer.push(&fragment) {
                                return Some((Ok(chunk), state));
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            debug!(target_id = %state.target_id, error = %e, "Skipping malformed SSE event");
                        }
                    }
                }
                Some(Err(EventStreamError::Transport(error))) => {
                    let error = transport_error(&state.target_id, error);
                    return state.fail(error);
                }
                Some(Err(error)) => {
                    warn!(target_id = %state.target_id, error = %error, "Skipping undecodable SSE data");
                }
                None => {
                    state.finished = true;
                    let last = state.buffer.finish();
                    return Some((Ok(last), state));
                }
            }
        }
    }))
}

fn transport_error(target_id: &str, error: HttpError) -> ProviderError {
    ProviderError::stream(target_id, error.to_string())
}
