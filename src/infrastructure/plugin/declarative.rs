//! Plugins backed by declarative unit entries

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::domain::llm::{ModelInfo, ProviderPreset};
use crate::domain::plugin::{
    Capability, ModelProvider, Plugin, PluginContext, PluginError, PluginMetadata,
    TemplateProvider,
};

/// Template provider defined by inline sources and/or a template directory
#[derive(Debug)]
pub struct DeclarativeTemplatePlugin {
    id: String,
    metadata: PluginMetadata,
    inline: BTreeMap<String, String>,
    template_dir: Option<PathBuf>,
    initialized: AtomicBool,
}

impl DeclarativeTemplatePlugin {
    pub fn new(
        id: impl Into<String>,
        metadata: PluginMetadata,
        inline: BTreeMap<String, String>,
        template_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            metadata,
            inline,
            template_dir,
            initialized: AtomicBool::new(false),
        }
    }

    fn read_template_dir(&self, dir: &Path) -> Result<HashMap<String, String>, PluginError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            PluginError::capability(&self.id, format!("cannot read {}: {}", dir.display(), e))
        })?;

        let mut templates = HashMap::new();

        for entry in entries {
            let entry = entry.map_err(|e| PluginError::capability(&self.id, e.to_string()))?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let source = std::fs::read_to_string(&path).map_err(|e| {
                PluginError::capability(&self.id, format!("cannot read {}: {}", path.display(), e))
            })?;

            templates.insert(name.to_string(), source);
        }

        Ok(templates)
    }
}

#[async_trait]
impl Plugin for DeclarativeTemplatePlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::TemplateProvider]
    }

    async fn initialize(&self, _context: PluginContext) -> Result<(), PluginError> {
        if let Some(dir) = &self.template_dir {
            if !dir.is_dir() {
                return Err(PluginError::initialization(
                    &self.id,
                    format!("template directory {} not found", dir.display()),
                ));
            }
        }

        self.initialized.store(true, Ordering::SeqCst);
        debug!(plugin_id = %self.id, "Template plugin initialized");
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), PluginError> {
        self.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn as_template_provider(&self) -> Option<&dyn TemplateProvider> {
        Some(self)
    }
}

#[async_trait]
impl TemplateProvider for DeclarativeTemplatePlugin {
    async fn templates(&self) -> Result<HashMap<String, String>, PluginError> {
        let mut templates = match &self.template_dir {
            Some(dir) => self.read_template_dir(dir)?,
            None => HashMap::new(),
        };

        // Inline sources win over files with the same name
        templates.extend(self.inline.iter().map(|(k, v)| (k.clone(), v.clone())));

        Ok(templates)
    }
}

/// Model provider defined by a static catalog
#[derive(Debug)]
pub struct DeclarativeModelPlugin {
    metadata: PluginMetadata,
    preset: Option<ProviderPreset>,
    models: Vec<ModelInfo>,
}

impl DeclarativeModelPlugin {
    pub fn new(
        metadata: PluginMetadata,
        preset: Option<ProviderPreset>,
        models: Vec<ModelInfo>,
    ) -> Self {
        Self {
            metadata,
            preset,
            models,
        }
    }
}

#[async_trait]
impl Plugin for DeclarativeModelPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::ModelProvider]
    }

    async fn initialize(&self, _context: PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), PluginError> {
        Ok(())
    }

    fn as_model_provider(&self) -> Option<&dyn ModelProvider> {
        Some(self)
    }
}

#[async_trait]
impl ModelProvider for DeclarativeModelPlugin {
    fn provider_preset(&self) -> Option<ProviderPreset> {
        self.preset.clone()
    }

    async fn models(&self) -> Result<Vec<ModelInfo>, PluginError> {
        Ok(self.models.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_inline_and_directory_templates_merge() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("app.py.j2"), "from file").unwrap();
        std::fs::write(dir.path().join("shared.j2"), "from file").unwrap();

        let mut inline = BTreeMap::new();
        inline.insert("shared.j2".to_string(), "inline".to_string());

        let plugin = DeclarativeTemplatePlugin::new(
            "pack.Templates",
            PluginMetadata::new("Pack", "1.0.0"),
            inline,
            Some(dir.path().to_path_buf()),
        );

        plugin.initialize(PluginContext::new("pack.Templates")).await.unwrap();
        let templates = plugin.templates().await.unwrap();

        assert_eq!(templates.len(), 2);
        assert_eq!(templates["app.py.j2"], "from file");
        assert_eq!(templates["shared.j2"], "inline");
    }

    #[tokio::test]
    async fn test_missing_template_dir_fails_initialization() {
        let plugin = DeclarativeTemplatePlugin::new(
            "pack.Templates",
            PluginMetadata::new("Pack", "1.0.0"),
            BTreeMap::new(),
            Some(PathBuf::from("/definitely/not/here")),
        );

        let result = plugin.initialize(PluginContext::new("pack.Templates")).await;

        assert!(matches!(result, Err(PluginError::Initialization { .. })));
    }

    #[tokio::test]
    async fn test_model_plugin_exposes_catalog() {
        let plugin = DeclarativeModelPlugin::new(
            PluginMetadata::new("Groq", "1.0.0"),
            Some(ProviderPreset::new("groq", "https://api.groq.com/openai/v1")),
            vec![ModelInfo::new("llama3-70b-8192")],
        );

        let provider = plugin.as_model_provider().unwrap();
        assert_eq!(provider.provider_preset().unwrap().id, "groq");
        assert!(provider.supports_model("llama3-70b-8192").await);
        assert!(!provider.supports_model("gpt-4o").await);
        assert!(plugin.as_template_provider().is_none());
    }
}
