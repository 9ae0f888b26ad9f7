//! Models command - lists provider and plugin model catalogs

use clap::Args;

use crate::config::{AppConfig, TargetConfig};
use crate::domain::llm::{ModelInfo, ProviderClient};
use crate::domain::settings::SettingsStore;
use crate::infrastructure::llm::LlmClientFactory;
use crate::infrastructure::plugin::PluginManager;

/// Arguments for the models command
#[derive(Args, Clone, Debug)]
pub struct ModelsArgs {
    /// Provider to query; without it only plugin catalogs are listed
    #[arg(long)]
    pub provider: Option<String>,

    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub api_base: Option<String>,
}

/// Run the models command
pub async fn run(args: ModelsArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();
    let settings = super::open_settings(&config);
    let plugins = super::start_plugins(&config, settings.clone()).await;

    super::shutdown_after(&plugins, list(args, &config, settings.as_ref(), &plugins)).await
}

async fn list(
    args: ModelsArgs,
    config: &AppConfig,
    settings: &dyn SettingsStore,
    plugins: &PluginManager,
) -> anyhow::Result<()> {
    for (key, model) in plugins.models().await {
        println!("{}", describe(&key, &model));
    }

    let Some(provider) = args.provider else {
        return Ok(());
    };

    let client = LlmClientFactory::create_client(config, plugins.provider_presets().await);
    let target_config = TargetConfig {
        provider: provider.clone(),
        model: String::new(),
        api_key: args.api_key,
        api_key_env: None,
        base_url: args.api_base,
        timeout_secs: None,
    };
    let target = LlmClientFactory::build_target(&target_config, &config.generation, settings, |name| {
        std::env::var(name).ok()
    })?;

    let models = client.list_models(&target).await;
    if models.is_empty() {
        eprintln!("No models returned by '{}'", provider);
    }
    for model in models {
        println!("{}", describe(&format!("{}/{}", provider, model.id), &model));
    }

    Ok(())
}

fn describe(key: &str, model: &ModelInfo) -> String {
    match (&model.name, model.context_length) {
        (Some(name), Some(context)) => format!("{}  ({}, {} tokens)", key, name, context),
        (Some(name), None) => format!("{}  ({})", key, name),
        (None, Some(context)) => format!("{}  ({} tokens)", key, context),
        (None, None) => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let model = ModelInfo::new("gpt-4o").with_name("GPT-4o").with_context_length(128_000);

        assert_eq!(
            describe("openai/gpt-4o", &model),
            "openai/gpt-4o  (GPT-4o, 128000 tokens)"
        );
        assert_eq!(describe("x", &ModelInfo::new("x")), "x");
    }
}
