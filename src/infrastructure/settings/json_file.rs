use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::settings::{SettingsError, SettingsStore};

/// Settings persisted as one JSON object on disk.
///
/// The whole file is rewritten on every `set`; the parent directory is
/// created on first write.
#[derive(Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl JsonFileSettingsStore {
    /// Open the store, loading existing values. A missing file starts empty;
    /// an unreadable or corrupt file is reported.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = Self::read(&path)?;

        debug!(path = %path.display(), entries = values.len(), "Settings loaded");

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Like [`open`](Self::open), but a corrupt file is logged and replaced
    /// by an empty map on the next write.
    pub fn open_or_default(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        match Self::read(&path) {
            Ok(values) => Self {
                path,
                values: RwLock::new(values),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable settings file");
                Self {
                    path,
                    values: RwLock::new(Map::new()),
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<Map<String, Value>, SettingsError> {
        if !path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::io(path.display().to_string(), e))?;

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(SettingsError::invalid(
                path.display().to_string(),
                "settings file must contain a JSON object",
            )),
        }
    }

    fn write(&self, values: &Map<String, Value>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SettingsError::io(parent.display().to_string(), e))?;
        }

        let content = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, content)
            .map_err(|e| SettingsError::io(self.path.display().to_string(), e))
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| SettingsError::invalid(key, "settings lock poisoned"))?;

        let mut updated = values.clone();
        updated.insert(key.to_string(), value);
        self.write(&updated)?;

        *values = updated;
        Ok(())
    }
}
