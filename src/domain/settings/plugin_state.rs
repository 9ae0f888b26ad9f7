//! Persisted per-plugin state

use super::error::SettingsError;
use super::store::SettingsStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Persisted record for one plugin, stored under `plugins.<registry id>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginState {
    #[serde(default)]
    pub enabled: bool,

    /// Re-enable on start and reload
    #[serde(default)]
    pub auto_enable: bool,

    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

impl PluginState {
    pub fn key(plugin_id: &str) -> String {
        format!("plugins.{}", plugin_id)
    }

    /// Load the state for a plugin; a missing key yields the default record
    pub fn load(store: &dyn SettingsStore, plugin_id: &str) -> Result<Self, SettingsError> {
        let key = Self::key(plugin_id);

        match store.get(&key) {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| SettingsError::invalid(key, e.to_string())),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, store: &dyn SettingsStore, plugin_id: &str) -> Result<(), SettingsError> {
        store.set(&Self::key(plugin_id), serde_json::to_value(self)?)
    }
}
