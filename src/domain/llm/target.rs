use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// One addressable backend: provider, credential, model and endpoint.
///
/// Targets are immutable once built. The API key is kept in a [`SecretString`]
/// and is redacted from `Debug` output.
pub struct Target {
    provider_id: String,
    api_key: SecretString,
    base_url: Option<String>,
    model: String,
    timeout: Duration,
}

impl Target {
    pub fn new(
        provider_id: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            api_key: SecretString::from(api_key.into()),
            base_url: None,
            model: model.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');

        self.base_url = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Identifier used in logs and failure records (`provider:model`)
    pub fn id(&self) -> String {
        format!("{}:{}", self.provider_id, self.model)
    }
}

impl Clone for Target {
    fn clone(&self) -> Self {
        Self {
            provider_id: self.provider_id.clone(),
            api_key: SecretString::from(self.api_key.expose_secret().to_owned()),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            timeout: self.timeout,
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("provider_id", &self.provider_id)
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_id_and_defaults() {
        let target = Target::new("openrouter", "mistral-7b", "sk-test");

        assert_eq!(target.id(), "openrouter:mistral-7b");
        assert_eq!(target.timeout(), DEFAULT_REQUEST_TIMEOUT);
        assert!(target.base_url().is_none());
    }

    #[test]
    fn test_base_url_is_normalized() {
        let target = Target::new("local", "llama3", "").with_base_url("http://localhost:11434/v1/");
        assert_eq!(target.base_url(), Some("http://localhost:11434/v1"));

        let blank = Target::new("local", "llama3", "").with_base_url("  ");
        assert!(blank.base_url().is_none());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let target = Target::new("openai", "gpt-4o", "sk-very-secret");
        let debug = format!("{:?}", target);

        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_clone_keeps_secret() {
        let target = Target::new("openai", "gpt-4o", "sk-abc").with_timeout(Duration::from_secs(5));
        let copy = target.clone();

        assert_eq!(copy.api_key().expose_secret(), "sk-abc");
        assert_eq!(copy.timeout(), Duration::from_secs(5));
    }
}
