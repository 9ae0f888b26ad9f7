//! Plugin domain module
//!
//! Provides traits and types for the plugin system that lets third parties add
//! code-generation templates and model catalogs without touching the core.
//!
//! ## Core Traits
//!
//! - `Plugin` - Base trait for all plugins with lifecycle hooks
//! - `TemplateProvider` - Extension contributing templates
//! - `ModelProvider` - Extension contributing model descriptors and presets

mod descriptor;
mod entity;
mod error;
mod extensions;
mod model_provider;
mod template_provider;
mod version;

pub use descriptor::{PluginConstructor, PluginDescriptor, PluginSource};
pub use entity::{Plugin, PluginContext, PluginLifecycle, PluginMetadata};
pub use error::PluginError;
pub use extensions::Capability;
pub use model_provider::ModelProvider;
pub use template_provider::TemplateProvider;
pub use version::satisfies_min_version;
