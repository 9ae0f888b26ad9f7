//! Provider error types

use thiserror::Error;

/// Failure of a single request against a single target
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request to '{target}' timed out after {timeout_ms}ms")]
    Timeout { target: String, timeout_ms: u64 },

    #[error("HTTP {status} from '{target}': {body}")]
    Http {
        target: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response from '{target}': {message}")]
    MalformedResponse { target: String, message: String },

    #[error("Transport error for '{target}': {message}")]
    Transport { target: String, message: String },

    #[error("Stream from '{target}' failed: {message}")]
    Stream { target: String, message: String },

    #[error("Configuration error for '{target}': {message}")]
    Configuration { target: String, message: String },
}

impl ProviderError {
    pub fn timeout(target: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            target: target.into(),
            timeout_ms,
        }
    }

    pub fn http(target: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            target: target.into(),
            status,
            body: body.into(),
        }
    }

    pub fn malformed(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn transport(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn stream(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn configuration(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Target the failing request was addressed to
    pub fn target(&self) -> &str {
        match self {
            Self::Timeout { target, .. }
            | Self::Http { target, .. }
            | Self::MalformedResponse { target, .. }
            | Self::Transport { target, .. }
            | Self::Stream { target, .. }
            | Self::Configuration { target, .. } => target,
        }
    }

    /// HTTP status, when the provider answered with one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
