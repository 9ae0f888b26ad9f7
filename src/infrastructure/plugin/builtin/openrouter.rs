//! OpenRouter Plugin
//!
//! Built-in model provider with a curated OpenRouter catalog.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::llm::{ModelInfo, ProviderPreset};
use crate::domain::plugin::{
    Capability, ModelProvider, Plugin, PluginContext, PluginDescriptor, PluginError,
    PluginMetadata, PluginSource,
};

pub const MODULE: &str = "openrouter";
pub const ENTRY: &str = "OpenRouterCatalog";

const BASE_URL: &str = "https://openrouter.ai/api/v1";

/// (id, display name, context length)
const CATALOG: &[(&str, &str, u64)] = &[
    ("openai/gpt-4-turbo", "GPT-4 Turbo", 128_000),
    ("openai/gpt-4o", "GPT-4o", 128_000),
    ("openai/gpt-4o-mini", "GPT-4o mini", 128_000),
    ("anthropic/claude-3-opus", "Claude 3 Opus", 200_000),
    ("anthropic/claude-3-sonnet", "Claude 3 Sonnet", 200_000),
    ("anthropic/claude-3-haiku", "Claude 3 Haiku", 200_000),
    ("deepseek/deepseek-coder", "DeepSeek Coder", 128_000),
    ("meta-llama/llama-3.1-70b-instruct", "Llama 3.1 70B Instruct", 131_072),
    ("mistralai/codestral-2501", "Codestral", 256_000),
];

/// OpenRouter model catalog plugin
#[derive(Debug)]
pub struct OpenRouterPlugin {
    metadata: PluginMetadata,
}

impl OpenRouterPlugin {
    pub fn new() -> Self {
        Self {
            metadata: metadata(),
        }
    }
}

impl Default for OpenRouterPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn metadata() -> PluginMetadata {
    PluginMetadata::new("OpenRouter", "1.0.0")
        .with_description("Curated OpenRouter model catalog")
        .with_author("PMP Codegen")
        .with_dependency("models")
}

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::new(
        format!("{}.{}", MODULE, ENTRY),
        metadata(),
        vec![Capability::ModelProvider],
        PluginSource::Builtin,
        || Ok(Arc::new(OpenRouterPlugin::new()) as Arc<dyn Plugin>),
    )
}

#[async_trait]
impl Plugin for OpenRouterPlugin {
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
impl ModelProvider for OpenRouterPlugin {
    fn provider_preset(&self) -> Option<ProviderPreset> {
        Some(ProviderPreset::new("openrouter", BASE_URL).with_display_name("OpenRouter"))
    }

    async fn models(&self) -> Result<Vec<ModelInfo>, PluginError> {
        Ok(CATALOG
            .iter()
            .map(|(id, name, context_length)| {
                ModelInfo::new(*id)
                    .with_name(*name)
                    .with_context_length(*context_length)
            })
            .collect())
    }
}
