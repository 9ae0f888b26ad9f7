use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default endpoint for an OpenAI-compatible provider id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPreset {
    pub id: String,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ProviderPreset {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Lookup table of provider presets keyed by provider id
#[derive(Debug, Clone, Default)]
pub struct ProviderPresets {
    presets: BTreeMap<String, ProviderPreset>,
}

impl ProviderPresets {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Presets shipped with the host
    pub fn builtin() -> Self {
        let mut presets = Self::empty();

        presets.insert(
            ProviderPreset::new("openrouter", "https://openrouter.ai/api/v1")
                .with_display_name("OpenRouter"),
        );
        presets.insert(
            ProviderPreset::new("openai", "https://api.openai.com/v1").with_display_name("OpenAI"),
        );
        presets.insert(
            ProviderPreset::new("groq", "https://api.groq.com/openai/v1").with_display_name("Groq"),
        );
        presets.insert(
            ProviderPreset::new("mistral", "https://api.mistral.ai/v1")
                .with_display_name("Mistral AI"),
        );
        presets.insert(
            ProviderPreset::new("local", "http://localhost:11434/v1")
                .with_display_name("Local (OpenAI-compatible)"),
        );

        presets
    }

    /// Insert or replace a preset
    pub fn insert(&mut self, preset: ProviderPreset) {
        self.presets.insert(preset.id.clone(), preset);
    }

    pub fn extend(&mut self, presets: impl IntoIterator<Item = ProviderPreset>) {
        for preset in presets {
            self.insert(preset);
        }
    }

    pub fn get(&self, provider_id: &str) -> Option<&ProviderPreset> {
        self.presets.get(provider_id)
    }

    pub fn base_url_for(&self, provider_id: &str) -> Option<&str> {
        self.get(provider_id).map(|p| p.base_url.as_str())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }
}

impl IntoIterator for ProviderPresets {
    type Item = ProviderPreset;
    type IntoIter = std::collections::btree_map::IntoValues<String, ProviderPreset>;

    fn into_iter(self) -> Self::IntoIter {
        self.presets.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_presets() {
        let presets = ProviderPresets::builtin();

        assert_eq!(
            presets.base_url_for("openrouter"),
            Some("https://openrouter.ai/api/v1")
        );
        assert_eq!(presets.base_url_for("openai"), Some("https://api.openai.com/v1"));
        assert!(presets.base_url_for("unknown").is_none());
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut presets = ProviderPresets::builtin();
        presets.insert(ProviderPreset::new("local", "http://127.0.0.1:8080/v1/"));

        assert_eq!(presets.base_url_for("local"), Some("http://127.0.0.1:8080/v1"));
    }
}
