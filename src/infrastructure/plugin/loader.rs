//! Plugin Loader
//!
//! Turns plugin directories into descriptors. A directory may hold:
//! - `<module>.toml` files, one unit each
//! - `<module>/plugin.toml` sub-directories, whose `templates/` folder is
//!   used as the default template directory
//!
//! Names starting with `.` or `_` are ignored. Units are loaded in isolation:
//! a broken unit yields a [`PluginError::Load`] and never affects its siblings.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::declarative::{DeclarativeModelPlugin, DeclarativeTemplatePlugin};
use super::unit::{PluginUnit, UnitEntry};
use crate::domain::plugin::{Capability, Plugin, PluginDescriptor, PluginError, PluginSource};

pub const UNIT_MANIFEST: &str = "plugin.toml";
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";

/// A unit found on disk, not yet parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLocation {
    /// Module name, first half of every registry id from this unit
    pub module: String,
    /// The TOML document
    pub path: PathBuf,
    /// Base for relative template directories
    pub root: PathBuf,
    /// Whether the unit is a sub-directory with its own layout
    pub packaged: bool,
}

/// Outcome of scanning one directory
#[derive(Debug, Default)]
pub struct ScanResult {
    pub descriptors: Vec<PluginDescriptor>,
    pub errors: Vec<PluginError>,
}

/// List the units of a directory in name order
pub fn find_units(dir: &Path) -> Result<Vec<UnitLocation>, PluginError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| PluginError::load(dir.display().to_string(), e.to_string()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    paths.sort();

    let mut units = Vec::new();

    for path in paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }

        if path.is_dir() {
            let manifest = path.join(UNIT_MANIFEST);
            if manifest.is_file() {
                units.push(UnitLocation {
                    module: name.to_string(),
                    path: manifest,
                    root: path.clone(),
                    packaged: true,
                });
            }
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            units.push(UnitLocation {
                module: stem.to_string(),
                root: dir.to_path_buf(),
                path,
                packaged: false,
            });
        }
    }

    Ok(units)
}

/// Parse one unit and build a descriptor for each recognized entry
pub fn load_unit(location: &UnitLocation) -> Result<Vec<PluginDescriptor>, PluginError> {
    let unit = PluginUnit::from_file(&location.path)
        .map_err(|e| PluginError::load(location.path.display().to_string(), e.to_string()))?;

    let mut descriptors = Vec::new();

    for (entry_name, entry) in unit.plugins {
        let id = format!("{}.{}", location.module, entry_name);

        let Ok(capability) = Capability::try_from(entry.kind.as_str()) else {
            warn!(
                plugin_id = %id,
                kind = %entry.kind,
                "Skipping plugin entry with unknown kind"
            );
            continue;
        };

        debug!(plugin_id = %id, capability = %capability, "Found plugin entry");
        descriptors.push(entry_descriptor(id, capability, entry, location));
    }

    Ok(descriptors)
}

/// Scan a directory, collecting descriptors and per-unit failures
pub fn scan_directory(dir: &Path) -> ScanResult {
    let mut result = ScanResult::default();

    if !dir.is_dir() {
        debug!(path = %dir.display(), "Plugin directory does not exist, skipping");
        return result;
    }

    let units = match find_units(dir) {
        Ok(units) => units,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Failed to scan plugin directory");
            result.errors.push(e);
            return result;
        }
    };

    for location in units {
        match load_unit(&location) {
            Ok(descriptors) => result.descriptors.extend(descriptors),
            Err(e) => {
                warn!(
                    module = %location.module,
                    path = %location.path.display(),
                    error = %e,
                    "Failed to load plugin unit"
                );
                result.errors.push(e);
            }
        }
    }

    result
}

fn entry_descriptor(
    id: String,
    capability: Capability,
    entry: UnitEntry,
    location: &UnitLocation,
) -> PluginDescriptor {
    let metadata = entry.metadata.clone();
    let source = PluginSource::File(location.path.clone());

    match capability {
        Capability::TemplateProvider => {
            let template_dir = resolve_template_dir(&entry, location);
            let entry = Arc::new(entry);
            let plugin_id = id.clone();

            PluginDescriptor::new(id, metadata, vec![capability], source, move || {
                Ok(Arc::new(DeclarativeTemplatePlugin::new(
                    plugin_id.clone(),
                    entry.metadata.clone(),
                    entry.templates.clone(),
                    template_dir.clone(),
                )) as Arc<dyn Plugin>)
            })
        }
        Capability::ModelProvider => {
            let entry = Arc::new(entry);

            PluginDescriptor::new(id, metadata, vec![capability], source, move || {
                Ok(Arc::new(DeclarativeModelPlugin::new(
                    entry.metadata.clone(),
                    entry.provider.clone(),
                    entry.models.clone(),
                )) as Arc<dyn Plugin>)
            })
        }
    }
}

fn resolve_template_dir(entry: &UnitEntry, location: &UnitLocation) -> Option<PathBuf> {
    match &entry.template_dir {
        Some(dir) => Some(location.root.join(dir)),
        None if location.packaged => {
            let default = location.root.join(DEFAULT_TEMPLATE_DIR);
            default.is_dir().then_some(default)
        }
        None => None,
    }
}
