//! Fallback chain entities

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde::Serialize;

use super::error::RouterError;
use crate::domain::llm::{ProviderError, StreamChunk, Target};

/// Ordered, non-empty sequence of targets tried front to back
#[derive(Debug, Clone)]
pub struct FallbackChain {
    targets: Vec<Target>,
}

impl FallbackChain {
    /// Build a chain; an empty target list is rejected
    pub fn new(targets: Vec<Target>) -> Result<Self, RouterError> {
        if targets.is_empty() {
            return Err(RouterError::InvalidChain);
        }

        Ok(Self { targets })
    }

    pub fn single(target: Target) -> Self {
        Self {
            targets: vec![target],
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Target> {
        self.targets.iter()
    }
}

impl TryFrom<Vec<Target>> for FallbackChain {
    type Error = RouterError;

    fn try_from(targets: Vec<Target>) -> Result<Self, Self::Error> {
        Self::new(targets)
    }
}

/// One failed attempt in the failure log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackAttempt {
    pub target_id: String,
    pub status: Option<u16>,
    pub message: String,
}

impl FallbackAttempt {
    pub fn from_error(target_id: impl Into<String>, error: &ProviderError) -> Self {
        Self {
            target_id: target_id.into(),
            status: error.status(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for FallbackAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target_id, self.message)
    }
}

/// Successful result of a routed request
#[derive(Debug, Clone)]
pub struct FallbackOutcome<T> {
    pub value: T,
    /// Target that produced the value
    pub target_id: String,
    /// Failures recorded before the successful target, in chain order
    pub failures: Vec<FallbackAttempt>,
}

type RoutedItems = Pin<Box<dyn Stream<Item = Result<StreamChunk, RouterError>> + Send>>;

/// Stream committed to one target after it yielded its first chunk.
///
/// A later failure of that target is reported once as
/// [`RouterError::StreamInterrupted`] and ends the stream.
pub struct CommittedStream {
    target_id: String,
    failures: Vec<FallbackAttempt>,
    items: RoutedItems,
}

impl CommittedStream {
    pub(crate) fn new(target_id: String, failures: Vec<FallbackAttempt>, items: RoutedItems) -> Self {
        Self {
            target_id,
            failures,
            items,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn failures(&self) -> &[FallbackAttempt] {
        &self.failures
    }
}

impl fmt::Debug for CommittedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommittedStream")
            .field("target_id", &self.target_id)
            .field("failures", &self.failures)
            .finish()
    }
}

impl Stream for CommittedStream {
    type Item = Result<StreamChunk, RouterError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.items.as_mut().poll_next(cx)
    }
}
