//! Model provider capability

use super::entity::Plugin;
use super::error::PluginError;
use crate::domain::llm::{ModelInfo, ProviderPreset};
use async_trait::async_trait;

/// Plugins contributing model descriptors and, optionally, a provider preset
#[async_trait]
pub trait ModelProvider: Plugin {
    /// Base URL preset registered for the provider this plugin describes
    fn provider_preset(&self) -> Option<ProviderPreset> {
        None
    }

    async fn models(&self) -> Result<Vec<ModelInfo>, PluginError>;

    /// Whether a model id is part of this catalog
    async fn supports_model(&self, model_id: &str) -> bool {
        self.models()
            .await
            .map(|models| models.iter().any(|m| m.id == model_id))
            .unwrap_or(false)
    }
}
