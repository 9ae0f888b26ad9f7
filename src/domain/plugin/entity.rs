//! Plugin entity types and core trait
//!
//! Defines the Plugin trait and associated metadata structures.

use super::error::PluginError;
use super::extensions::Capability;
use super::model_provider::ModelProvider;
use super::template_provider::TemplateProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Debug};

/// Static facts about a plugin, readable without instantiating it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Human-readable name
    pub name: String,

    /// Plugin version
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: Option<String>,

    /// Host capabilities or other plugins (id or name) this plugin needs
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Lowest host version the plugin works with
    #[serde(default)]
    pub min_host_version: Option<String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl PluginMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            author: None,
            dependencies: Vec::new(),
            min_host_version: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_min_host_version(mut self, version: impl Into<String>) -> Self {
        self.min_host_version = Some(version.into());
        self
    }

    /// `name vversion`, used to identify a plugin in logs
    pub fn display_id(&self) -> String {
        format!("{} v{}", self.name, self.version)
    }
}

/// Context provided to plugins during initialization
#[derive(Debug, Clone, Default)]
pub struct PluginContext {
    /// Registry id of the plugin being initialized
    pub plugin_id: String,

    /// Persisted per-plugin configuration
    pub config: HashMap<String, serde_json::Value>,

    /// Version of the running host
    pub host_version: String,
}

impl PluginContext {
    pub fn new(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            config: HashMap::new(),
            host_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_config(mut self, config: HashMap<String, serde_json::Value>) -> Self {
        self.config = config;
        self
    }

    pub fn with_host_version(mut self, version: impl Into<String>) -> Self {
        self.host_version = version.into();
        self
    }

    /// Get a config value as a specific type
    pub fn get_config<T: for<'de> Deserialize<'de>>(
        &self,
        key: &str,
    ) -> Result<Option<T>, serde_json::Error> {
        match self.config.get(key) {
            Some(value) => serde_json::from_value(value.clone()).map(Some),
            None => Ok(None),
        }
    }

    /// Get a config value with a default
    pub fn get_config_or<T: for<'de> Deserialize<'de>>(
        &self,
        key: &str,
        default: T,
    ) -> Result<T, serde_json::Error> {
        self.get_config(key).map(|opt| opt.unwrap_or(default))
    }
}

/// Where a plugin stands from the manager's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginLifecycle {
    /// Not present in the current registry snapshot
    Undiscovered,

    /// Registered, never enabled or last enable attempt failed
    Discovered,

    /// `initialize()` in progress
    Initializing,

    Enabled,

    Disabled,
}

impl PluginLifecycle {
    pub fn is_enabled(&self) -> bool {
        matches!(self, PluginLifecycle::Enabled)
    }

    pub fn can_enable(&self) -> bool {
        matches!(self, PluginLifecycle::Discovered | PluginLifecycle::Disabled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginLifecycle::Undiscovered => "undiscovered",
            PluginLifecycle::Discovered => "discovered",
            PluginLifecycle::Initializing => "initializing",
            PluginLifecycle::Enabled => "enabled",
            PluginLifecycle::Disabled => "disabled",
        }
    }
}

impl fmt::Display for PluginLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Core plugin trait that all plugins must implement
#[async_trait]
pub trait Plugin: Send + Sync + Debug {
    fn metadata(&self) -> &PluginMetadata;

    /// Capability contracts this instance fulfils
    fn capabilities(&self) -> Vec<Capability>;

    /// Called once when the plugin is enabled
    async fn initialize(&self, context: PluginContext) -> Result<(), PluginError>;

    /// Called once when the plugin is disabled
    async fn cleanup(&self) -> Result<(), PluginError>;

    fn as_template_provider(&self) -> Option<&dyn TemplateProvider> {
        None
    }

    fn as_model_provider(&self) -> Option<&dyn ModelProvider> {
        None
    }
}
