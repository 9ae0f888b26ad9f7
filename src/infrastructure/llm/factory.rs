use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::http_client::HttpClient;
use super::openai_compatible::{Attribution, OpenAiCompatibleClient};
use super::retry::RetryPolicy;
use crate::config::{AppConfig, GenerationConfig, RetrySettings, TargetConfig};
use crate::domain::chain::{FallbackChain, FallbackRouter, FallbackRouterConfig, RouterError};
use crate::domain::llm::{ProviderClient, ProviderPreset, ProviderPresets, Target};
use crate::domain::settings::{SettingsStore, provider_api_key_key};

/// Error building clients or chains from configuration
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("No API key for provider '{provider}': set api_key, api_key_env or save one in settings")]
    MissingApiKey { provider: String },

    #[error(transparent)]
    Chain(#[from] RouterError),
}

/// Builds provider clients, targets and routers from [`AppConfig`]
#[derive(Debug)]
pub struct LlmClientFactory;

impl LlmClientFactory {
    pub fn retry_policy(settings: &RetrySettings) -> RetryPolicy {
        RetryPolicy::new(settings.max_attempts)
            .with_initial_backoff(Duration::from_millis(settings.initial_backoff_ms))
            .with_backoff_multiplier(settings.backoff_multiplier)
            .with_max_backoff(Duration::from_millis(settings.max_backoff_ms))
    }

    pub fn router_config(generation: &GenerationConfig) -> FallbackRouterConfig {
        FallbackRouterConfig::default()
            .with_fallback_delay(Duration::from_millis(generation.fallback_delay_ms))
            .with_stream_buffer(generation.stream_buffer)
    }

    /// Client over the real HTTP stack; `extra_presets` usually come from
    /// enabled model-provider plugins and never override a built-in preset
    pub fn create_client(
        config: &AppConfig,
        extra_presets: Vec<ProviderPreset>,
    ) -> OpenAiCompatibleClient<HttpClient> {
        let mut presets = ProviderPresets::empty();
        presets.extend(extra_presets);
        presets.extend(ProviderPresets::builtin());

        OpenAiCompatibleClient::new(HttpClient::new())
            .with_presets(presets)
            .with_retry(Self::retry_policy(&config.retry))
            .with_flush_threshold(config.generation.flush_threshold)
            .with_attribution(Attribution {
                referer: config.generation.app_referer.clone(),
                title: config.generation.app_title.clone(),
            })
    }

    pub fn create_router(config: &AppConfig, client: Arc<dyn ProviderClient>) -> FallbackRouter {
        FallbackRouter::new(client, Self::router_config(&config.generation))
            .with_span(tracing::info_span!("fallback_router"))
    }

    /// API key precedence: inline value, environment variable, saved setting
    pub fn resolve_api_key<E>(
        target: &TargetConfig,
        settings: &dyn SettingsStore,
        env: E,
    ) -> Result<String, FactoryError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let inline = target.api_key.clone().filter(|key| !key.is_empty());
        let from_env = || {
            target
                .api_key_env
                .as_deref()
                .and_then(|name| env(name))
                .filter(|key| !key.is_empty())
        };
        let from_settings = || {
            settings
                .get(&provider_api_key_key(&target.provider))
                .and_then(|value| value.as_str().map(str::to_string))
                .filter(|key| !key.is_empty())
        };

        inline
            .or_else(from_env)
            .or_else(from_settings)
            .ok_or_else(|| FactoryError::MissingApiKey {
                provider: target.provider.clone(),
            })
    }

    pub fn build_target<E>(
        target: &TargetConfig,
        generation: &GenerationConfig,
        settings: &dyn SettingsStore,
        env: E,
    ) -> Result<Target, FactoryError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let api_key = Self::resolve_api_key(target, settings, env)?;
        let timeout = target.timeout_secs.unwrap_or(generation.request_timeout_secs);

        let mut built = Target::new(&target.provider, &target.model, api_key)
            .with_timeout(Duration::from_secs(timeout));

        if let Some(base_url) = &target.base_url {
            built = built.with_base_url(base_url);
        }

        debug!(target_id = %built.id(), "Configured fallback target");
        Ok(built)
    }

    /// Chain in configuration order, reading keys from the process environment
    pub fn build_chain(
        targets: &[TargetConfig],
        generation: &GenerationConfig,
        settings: &dyn SettingsStore,
    ) -> Result<FallbackChain, FactoryError> {
        Self::build_chain_with_env(targets, generation, settings, |name| {
            std::env::var(name).ok()
        })
    }

    pub fn build_chain_with_env<E>(
        targets: &[TargetConfig],
        generation: &GenerationConfig,
        settings: &dyn SettingsStore,
        env: E,
    ) -> Result<FallbackChain, FactoryError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let built = targets
            .iter()
            .map(|target| Self::build_target(target, generation, settings, &env))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FallbackChain::new(built)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settings::MockSettingsStore;
    use secrecy::ExposeSecret;
    use serde_json::json;

    fn target_config(provider: &str) -> TargetConfig {
        TargetConfig {
            provider: provider.to_string(),
            model: "deepseek/deepseek-coder".to_string(),
            api_key: None,
            api_key_env: None,
            base_url: None,
            timeout_secs: None,
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_inline_key_wins() {
        let mut target = target_config("openrouter");
        target.api_key = Some("sk-inline".into());
        target.api_key_env = Some("OPENROUTER_API_KEY".into());
        let settings = MockSettingsStore::new();

        let key = LlmClientFactory::resolve_api_key(&target, &settings, |_| Some("sk-env".into()))
            .unwrap();

        assert_eq!(key, "sk-inline");
    }

    #[test]
    fn test_env_then_settings() {
        let mut target = target_config("openrouter");
        target.api_key_env = Some("OPENROUTER_API_KEY".into());

        let mut settings = MockSettingsStore::new();
        settings
            .expect_get()
            .withf(|key| key == "providers.openrouter.api_key")
            .returning(|_| Some(json!("sk-saved")));

        let from_env = LlmClientFactory::resolve_api_key(&target, &settings, |name| {
            (name == "OPENROUTER_API_KEY").then(|| "sk-env".to_string())
        })
        .unwrap();
        assert_eq!(from_env, "sk-env");

        let from_settings = LlmClientFactory::resolve_api_key(&target, &settings, no_env).unwrap();
        assert_eq!(from_settings, "sk-saved");
    }

    #[test]
    fn test_missing_key() {
        let mut settings = MockSettingsStore::new();
        settings.expect_get().returning(|_| None);

        let result = LlmClientFactory::resolve_api_key(&target_config("groq"), &settings, no_env);

        assert!(matches!(result, Err(FactoryError::MissingApiKey { provider }) if provider == "groq"));
    }

    #[test]
    fn test_build_chain_keeps_order_and_overrides() {
        let mut first = target_config("openrouter");
        first.api_key = Some("k1".into());
        let mut second = target_config("custom");
        second.api_key = Some("k2".into());
        second.base_url = Some("https://llm.internal/v1/".into());
        second.timeout_secs = Some(5);

        let settings = MockSettingsStore::new();
        let generation = GenerationConfig::default();

        let chain =
            LlmClientFactory::build_chain_with_env(&[first, second], &generation, &settings, no_env)
                .unwrap();

        let targets = chain.targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].provider_id(), "openrouter");
        assert_eq!(targets[0].timeout(), Duration::from_secs(60));
        assert_eq!(targets[1].base_url(), Some("https://llm.internal/v1"));
        assert_eq!(targets[1].timeout(), Duration::from_secs(5));
        assert_eq!(targets[1].api_key().expose_secret(), "k2");
    }

    #[test]
    fn test_empty_target_list_is_invalid_chain() {
        let settings = MockSettingsStore::new();

        let result = LlmClientFactory::build_chain_with_env(
            &[],
            &GenerationConfig::default(),
            &settings,
            no_env,
        );

        assert!(matches!(result, Err(FactoryError::Chain(RouterError::InvalidChain))));
    }

    #[test]
    fn test_plugin_presets_do_not_override_builtins() {
        let config = AppConfig::default();
        let client = LlmClientFactory::create_client(
            &config,
            vec![
                ProviderPreset::new("groq", "https://proxy.example/groq"),
                ProviderPreset::new("together", "https://api.together.xyz/v1"),
            ],
        );

        assert_eq!(
            client.presets().base_url_for("together"),
            Some("https://api.together.xyz/v1")
        );
        assert_ne!(
            client.presets().base_url_for("groq"),
            Some("https://proxy.example/groq")
        );
    }

    #[test]
    fn test_router_config_from_generation() {
        let generation = GenerationConfig {
            fallback_delay_ms: 0,
            stream_buffer: 0,
            ..Default::default()
        };

        let config = LlmClientFactory::router_config(&generation);

        assert_eq!(config.fallback_delay, Duration::ZERO);
        assert_eq!(config.stream_buffer, 1);
    }
}
