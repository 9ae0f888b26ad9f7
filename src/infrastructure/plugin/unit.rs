//! Declarative plugin units
//!
//! A unit is a TOML document holding one or more plugin entries:
//!
//! ```toml
//! [plugins.FlaskTemplates]
//! kind = "template_provider"
//! name = "Flask Templates"
//! version = "1.0.0"
//! template_dir = "templates"
//!
//! [plugins.FlaskTemplates.templates]
//! flask_app = "from flask import Flask"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::domain::llm::{ModelInfo, ProviderPreset};
use crate::domain::plugin::PluginMetadata;

/// Error type for plugin unit parsing
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("Failed to read unit: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid unit: {0}")]
    Validation(String),
}

/// Root of a unit document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginUnit {
    /// Entries keyed by entry name
    #[serde(default)]
    pub plugins: BTreeMap<String, UnitEntry>,
}

/// One plugin entry of a unit
#[derive(Debug, Clone, Deserialize)]
pub struct UnitEntry {
    /// Capability contract name; unknown kinds are skipped by the loader
    pub kind: String,

    #[serde(flatten)]
    pub metadata: PluginMetadata,

    /// Inline template sources keyed by template name
    #[serde(default)]
    pub templates: BTreeMap<String, String>,

    /// Directory of template files, relative to the unit root
    #[serde(default)]
    pub template_dir: Option<PathBuf>,

    /// Provider preset contributed by a model provider
    #[serde(default)]
    pub provider: Option<ProviderPreset>,

    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

impl PluginUnit {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, UnitError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading plugin unit");

        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, UnitError> {
        let unit: PluginUnit = toml::from_str(content)?;
        unit.validate()?;
        Ok(unit)
    }

    fn validate(&self) -> Result<(), UnitError> {
        if self.plugins.is_empty() {
            return Err(UnitError::Validation("unit declares no plugins".into()));
        }

        for (entry_name, entry) in &self.plugins {
            if entry_name.trim().is_empty() || entry_name.contains('.') {
                return Err(UnitError::Validation(format!(
                    "invalid entry name '{}'",
                    entry_name
                )));
            }

            if entry.metadata.name.trim().is_empty() {
                return Err(UnitError::Validation(format!(
                    "entry '{}' has an empty name",
                    entry_name
                )));
            }

            if let Some(dir) = &entry.template_dir {
                let escapes = dir
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
                if escapes {
                    return Err(UnitError::Validation(format!(
                        "entry '{}' template_dir must stay inside the unit",
                        entry_name
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template_entry() {
        let unit = PluginUnit::from_str(
            r#"
[plugins.FlaskTemplates]
kind = "template_provider"
name = "Flask Templates"
version = "2.0.0"
author = "Someone"
dependencies = ["templates"]
min_host_version = "0.1"

[plugins.FlaskTemplates.templates]
flask_app = "from flask import Flask"
"#,
        )
        .unwrap();

        let entry = &unit.plugins["FlaskTemplates"];
        assert_eq!(entry.kind, "template_provider");
        assert_eq!(entry.metadata.name, "Flask Templates");
        assert_eq!(entry.metadata.version, "2.0.0");
        assert_eq!(entry.metadata.dependencies, vec!["templates"]);
        assert_eq!(entry.templates["flask_app"], "from flask import Flask");
    }

    #[test]
    fn test_parse_model_entry() {
        let unit = PluginUnit::from_str(
            r#"
[plugins.GroqCatalog]
kind = "model_provider"
name = "Groq"

[plugins.GroqCatalog.provider]
id = "groq"
base_url = "https://api.groq.com/openai/v1"

[[plugins.GroqCatalog.models]]
id = "llama3-70b-8192"
name = "Llama 3 70B"
context_length = 8192
"#,
        )
        .unwrap();

        let entry = &unit.plugins["GroqCatalog"];
        assert_eq!(entry.metadata.version, "0.1.0");
        assert_eq!(entry.provider.as_ref().unwrap().id, "groq");
        assert_eq!(entry.models.len(), 1);
        assert_eq!(entry.models[0].context_length, Some(8192));
    }

    #[test]
    fn test_empty_unit_is_rejected() {
        assert!(matches!(
            PluginUnit::from_str(""),
            Err(UnitError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_kind_is_rejected() {
        let result = PluginUnit::from_str(
            r#"
[plugins.Entry]
name = "No kind"
"#,
        );

        assert!(matches!(result, Err(UnitError::Toml(_))));
    }

    #[test]
    fn test_absolute_template_dir_is_rejected() {
        let result = PluginUnit::from_str(
            r#"
[plugins.Entry]
kind = "template_provider"
name = "Abs"
template_dir = "/etc"
"#,
        );

        assert!(matches!(result, Err(UnitError::Validation(_))));
    }

    #[test]
    fn test_parent_template_dir_is_rejected() {
        for dir in ["..", "../shared", "templates/../../etc"] {
            let result = PluginUnit::from_str(&format!(
                r#"
[plugins.Entry]
kind = "template_provider"
name = "Escape"
template_dir = "{}"
"#,
                dir
            ));

            assert!(matches!(result, Err(UnitError::Validation(_))), "{} accepted", dir);
        }
    }

    #[test]
    fn test_nested_template_dir_is_accepted() {
        let unit = PluginUnit::from_str(
            r#"
[plugins.Entry]
kind = "template_provider"
name = "Nested"
template_dir = "./assets/templates"
"#,
        );

        assert!(unit.is_ok());
    }
}
