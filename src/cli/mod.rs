//! CLI module for PMP Codegen
//!
//! Provides subcommands for generating code and managing plugins:
//! - `generate`: run a prompt through a fallback chain of providers
//! - `models`: list models of a provider and of enabled plugins
//! - `plugins`: list, enable and disable plugins
//! - `templates`: list templates of enabled plugins

pub mod generate;
pub mod models;
pub mod plugins;
pub mod templates;

use std::future::Future;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::domain::settings::SettingsStore;
use crate::infrastructure::logging;
use crate::infrastructure::plugin::PluginManager;
use crate::infrastructure::settings::{InMemorySettingsStore, JsonFileSettingsStore};

/// PMP Codegen - AI code generation with provider fallback and plugins
#[derive(Parser)]
#[command(name = "pmp-codegen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate code from a prompt, falling back across providers
    Generate(generate::GenerateArgs),

    /// List models offered by a provider and by enabled plugins
    Models(models::ModelsArgs),

    /// Manage plugins
    #[command(subcommand)]
    Plugins(plugins::PluginsCommand),

    /// List templates contributed by enabled plugins
    Templates,
}

/// Load `.env` and configuration, then install logging
pub(crate) fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Ignoring invalid configuration: {}", e);
        AppConfig::default()
    });
    logging::init_logging(&config.logging);

    config
}

/// Settings persisted in the configured JSON file, in memory when no home
/// directory is available
pub(crate) fn open_settings(config: &AppConfig) -> Arc<dyn SettingsStore> {
    match config.plugins.settings_path() {
        Some(path) => {
            debug!(path = %path.display(), "Using settings file");
            Arc::new(JsonFileSettingsStore::open_or_default(path))
        }
        None => {
            warn!("No home directory, settings will not be persisted");
            Arc::new(InMemorySettingsStore::new())
        }
    }
}

/// Discover plugins and enable the auto-enabled ones
pub(crate) async fn start_plugins(
    config: &AppConfig,
    settings: Arc<dyn SettingsStore>,
) -> PluginManager {
    let manager = PluginManager::from_config(&config.plugins, settings)
        .with_span(tracing::info_span!("plugins"));

    let report = manager.start().await;
    for error in &report.errors {
        warn!(error = %error, "Plugin unit skipped");
    }

    manager
}

/// Await `work`, then shut plugins down whatever its outcome
pub(crate) async fn shutdown_after<T>(
    plugins: &PluginManager,
    work: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    let outcome = work.await;
    plugins.shutdown().await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plugin::PluginLifecycle;
    use crate::infrastructure::plugin::PluginRegistry;

    #[tokio::test]
    async fn test_plugins_shut_down_when_work_fails() {
        let manager = PluginManager::new(
            PluginRegistry::new(),
            Arc::new(InMemorySettingsStore::new()),
            Vec::new(),
        );
        manager.start().await;
        assert!(manager.enable("fastapi.FastApiTemplates", false).await);

        let result: anyhow::Result<()> =
            shutdown_after(&manager, async { Err(anyhow::anyhow!("all providers exhausted")) })
                .await;

        assert!(result.is_err());
        assert!(manager.active_plugins().await.is_empty());
        assert_eq!(
            manager.lifecycle("fastapi.FastApiTemplates").await,
            PluginLifecycle::Disabled
        );
    }

    #[tokio::test]
    async fn test_shutdown_after_passes_value_through() {
        let manager = PluginManager::new(
            PluginRegistry::new(),
            Arc::new(InMemorySettingsStore::new()),
            Vec::new(),
        );

        let value = shutdown_after(&manager, async { Ok(7) }).await.unwrap();

        assert_eq!(value, 7);
    }
}
