use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::settings::{SettingsError, SettingsStore};

/// Volatile settings store, used by tests and when no settings file is available
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    values: RwLock<HashMap<String, Value>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| SettingsError::invalid(key, "settings lock poisoned"))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}
