//! Plugin Infrastructure
//!
//! This module provides the infrastructure layer for the plugin system, including:
//! - Plugin registry built from the built-in catalog and plugin directories
//! - Loader for declarative TOML plugin units
//! - Plugin manager tracking enabled plugins and their persisted state
//! - Built-in template and model catalog plugins

pub mod builtin;
pub mod declarative;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod unit;

pub use builtin::{DjangoPlugin, FastApiPlugin, OpenRouterPlugin, builtin_descriptors};
pub use declarative::{DeclarativeModelPlugin, DeclarativeTemplatePlugin};
pub use loader::{ScanResult, UnitLocation, find_units, load_unit, scan_directory};
pub use manager::PluginManager;
pub use registry::{DEFAULT_HOST_CAPABILITIES, DiscoveryReport, PluginRegistry};
pub use unit::{PluginUnit, UnitEntry, UnitError};
