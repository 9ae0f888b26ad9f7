//! Settings collaborator trait

use super::error::SettingsError;
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

/// Key/value settings persistence used by the plugin manager and the CLI
#[cfg_attr(test, automock)]
pub trait SettingsStore: Send + Sync {
    /// Read a value; `None` when the key was never set
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a value, persisting it before returning
    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError>;
}

/// Settings key holding the API key saved for a provider
pub fn provider_api_key_key(provider_id: &str) -> String {
    format!("providers.{}.api_key", provider_id)
}
