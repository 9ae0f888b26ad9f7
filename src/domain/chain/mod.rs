//! Fallback chain domain - ordered targets and the router that walks them

mod entity;
mod error;
mod router;

pub use entity::{CommittedStream, FallbackAttempt, FallbackChain, FallbackOutcome};
pub use error::RouterError;
pub use router::{
    DEFAULT_FALLBACK_DELAY, DEFAULT_STREAM_BUFFER, FallbackRouter, FallbackRouterConfig,
};
