//! Fallback router error types

use thiserror::Error;

use super::entity::FallbackAttempt;
use crate::domain::llm::ProviderError;

/// Terminal errors surfaced to callers of the fallback router
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Fallback chain must contain at least one target")]
    InvalidChain,

    #[error("All {chain_len} provider(s) exhausted; last target '{last_target}': {last_error}")]
    AllProvidersExhausted {
        chain_len: usize,
        last_target: String,
        #[source]
        last_error: ProviderError,
        failures: Vec<FallbackAttempt>,
    },

    /// The committed target failed after partial output was delivered.
    /// Already-delivered chunks are not retracted.
    #[error("Stream from '{target}' interrupted after {chunks_delivered} chunk(s): {source}")]
    StreamInterrupted {
        target: String,
        chunks_delivered: usize,
        #[source]
        source: ProviderError,
    },

    #[error("Generation cancelled")]
    Cancelled,
}

impl RouterError {
    /// Failure log carried by an exhausted chain
    pub fn failures(&self) -> &[FallbackAttempt] {
        match self {
            Self::AllProvidersExhausted { failures, .. } => failures,
            _ => &[],
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_display_carries_context() {
        let last_error = ProviderError::http("openai:gpt-4o", 502, "bad gateway");
        let failures = vec![FallbackAttempt::from_error("openai:gpt-4o", &last_error)];
        let error = RouterError::AllProvidersExhausted {
            chain_len: 1,
            last_target: "openai:gpt-4o".to_string(),
            last_error,
            failures,
        };

        assert_eq!(
            error.to_string(),
            "All 1 provider(s) exhausted; last target 'openai:gpt-4o': HTTP 502 from 'openai:gpt-4o': bad gateway"
        );
        assert_eq!(error.failures().len(), 1);
    }

    #[test]
    fn test_interrupted_display() {
        let error = RouterError::StreamInterrupted {
            target: "local:llama3".to_string(),
            chunks_delivered: 3,
            source: ProviderError::stream("local:llama3", "connection reset"),
        };

        assert_eq!(
            error.to_string(),
            "Stream from 'local:llama3' interrupted after 3 chunk(s): Stream from 'local:llama3' failed: connection reset"
        );
        assert!(error.failures().is_empty());
    }
}
