//! Plugin error types

use thiserror::Error;

/// Plugin-specific errors
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Failed to load plugin unit '{unit}': {message}")]
    Load { unit: String, message: String },

    #[error("Plugin initialization failed for '{plugin_id}': {message}")]
    Initialization { plugin_id: String, message: String },

    #[error("Plugin cleanup failed for '{plugin_id}': {message}")]
    Cleanup { plugin_id: String, message: String },

    #[error("Plugin '{plugin_id}' depends on unavailable '{dependency}'")]
    DependencyMissing {
        plugin_id: String,
        dependency: String,
    },

    #[error("Plugin '{plugin_id}' requires host version {required}, running {host}")]
    IncompatibleHost {
        plugin_id: String,
        required: String,
        host: String,
    },

    #[error("Plugin not found: {plugin_id}")]
    NotFound { plugin_id: String },

    #[error("Capability error for '{plugin_id}': {message}")]
    Capability { plugin_id: String, message: String },

    #[error("Plugin settings error: {message}")]
    Settings { message: String },
}

impl PluginError {
    pub fn load(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            unit: unit.into(),
            message: message.into(),
        }
    }

    pub fn initialization(plugin_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Initialization {
            plugin_id: plugin_id.into(),
            message: message.into(),
        }
    }

    pub fn cleanup(plugin_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Cleanup {
            plugin_id: plugin_id.into(),
            message: message.into(),
        }
    }

    pub fn dependency_missing(
        plugin_id: impl Into<String>,
        dependency: impl Into<String>,
    ) -> Self {
        Self::DependencyMissing {
            plugin_id: plugin_id.into(),
            dependency: dependency.into(),
        }
    }

    pub fn incompatible_host(
        plugin_id: impl Into<String>,
        required: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self::IncompatibleHost {
            plugin_id: plugin_id.into(),
            required: required.into(),
            host: host.into(),
        }
    }

    pub fn not_found(plugin_id: impl Into<String>) -> Self {
        Self::NotFound {
            plugin_id: plugin_id.into(),
        }
    }

    pub fn capability(plugin_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Capability {
            plugin_id: plugin_id.into(),
            message: message.into(),
        }
    }

    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings {
            message: message.into(),
        }
    }
}
