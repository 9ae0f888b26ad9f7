//! Plugin Manager
//!
//! Owns the registry and the set of enabled plugin instances. All lifecycle
//! operations are serialized through one async mutex; enable/disable state is
//! persisted through the settings store.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Instrument, Span, debug, error, info, warn};

use super::registry::{DiscoveryReport, PluginRegistry};
use crate::config::PluginsConfig;
use crate::domain::llm::{ModelInfo, ProviderPreset};
use crate::domain::plugin::{
    Plugin, PluginContext, PluginDescriptor, PluginLifecycle, PluginMetadata,
};
use crate::domain::settings::{PluginState, SettingsStore};

#[derive(Debug)]
struct ManagerState {
    registry: PluginRegistry,
    active: BTreeMap<String, Arc<dyn Plugin>>,
    /// Only transitional and disabled states; the rest is derived
    lifecycle: HashMap<String, PluginLifecycle>,
    /// Descriptors linked by the host, re-registered after every discovery
    linked: Vec<PluginDescriptor>,
}

impl ManagerState {
    fn lifecycle(&self, plugin_id: &str) -> PluginLifecycle {
        if self.active.contains_key(plugin_id) {
            return PluginLifecycle::Enabled;
        }

        if !self.registry.contains(plugin_id) {
            return PluginLifecycle::Undiscovered;
        }

        self.lifecycle
            .get(plugin_id)
            .copied()
            .unwrap_or(PluginLifecycle::Discovered)
    }
}

/// Enables, disables and queries plugins
pub struct PluginManager {
    state: Mutex<ManagerState>,
    settings: Arc<dyn SettingsStore>,
    search_paths: Vec<PathBuf>,
    span: Span,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("search_paths", &self.search_paths)
            .finish_non_exhaustive()
    }
}

impl PluginManager {
    pub fn new(
        registry: PluginRegistry,
        settings: Arc<dyn SettingsStore>,
        search_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            state: Mutex::new(ManagerState {
                registry,
                active: BTreeMap::new(),
                lifecycle: HashMap::new(),
                linked: Vec::new(),
            }),
            settings,
            search_paths,
            span: Span::none(),
        }
    }

    /// Build a manager whose registry follows the plugin configuration
    pub fn from_config(config: &PluginsConfig, settings: Arc<dyn SettingsStore>) -> Self {
        let registry = PluginRegistry::new()
            .with_builtins(config.builtin_enabled)
            .with_host_capabilities(config.host_capabilities.iter().cloned());

        Self::new(registry, settings, config.search_paths())
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Register a host-linked plugin; it survives rediscovery
    pub async fn register_descriptor(&self, descriptor: PluginDescriptor) {
        let mut state = self.state.lock().await;
        state.linked.push(descriptor.clone());
        state.registry.register_descriptor(descriptor);
    }

    /// Initial discovery followed by auto-enable
    pub async fn start(&self) -> DiscoveryReport {
        let span = self.span.clone();
        async move {
            let mut state = self.state.lock().await;
            self.discover_and_auto_enable(&mut state).await
        }
        .instrument(span)
        .await
    }

    /// Disable everything, rediscover, then re-enable auto-enabled plugins
    pub async fn reload(&self) -> DiscoveryReport {
        let span = self.span.clone();
        async move {
            let mut state = self.state.lock().await;

            let ids: Vec<String> = state.active.keys().cloned().collect();
            for id in ids {
                self.deactivate(&mut state, &id, false).await;
            }

            info!("Reloading plugins");
            self.discover_and_auto_enable(&mut state).await
        }
        .instrument(span)
        .await
    }

    /// Disable every active plugin without touching persisted state
    pub async fn shutdown(&self) {
        let span = self.span.clone();
        async move {
            let mut state = self.state.lock().await;

            let ids: Vec<String> = state.active.keys().cloned().collect();
            for id in ids {
                self.deactivate(&mut state, &id, false).await;
            }

            debug!("Plugin manager shut down");
        }
        .instrument(span)
        .await
    }

    /// Enable a plugin. Returns `true` if it is enabled afterwards.
    pub async fn enable(&self, plugin_id: &str, auto_enable: bool) -> bool {
        let span = self.span.clone();
        async move {
            let mut state = self.state.lock().await;
            self.activate(&mut state, plugin_id, auto_enable).await
        }
        .instrument(span)
        .await
    }

    /// Disable a plugin and persist `enabled = false`. Returns `false` only
    /// when cleanup failed; the plugin is inactive either way.
    pub async fn disable(&self, plugin_id: &str) -> bool {
        let span = self.span.clone();
        async move {
            let mut state = self.state.lock().await;
            self.deactivate(&mut state, plugin_id, true).await
        }
        .instrument(span)
        .await
    }

    pub async fn lifecycle(&self, plugin_id: &str) -> PluginLifecycle {
        self.state.lock().await.lifecycle(plugin_id)
    }

    pub async fn active_plugins(&self) -> BTreeMap<String, Arc<dyn Plugin>> {
        self.state.lock().await.active.clone()
    }

    /// Metadata of every discovered plugin
    pub async fn available(&self) -> BTreeMap<String, PluginMetadata> {
        self.state.lock().await.registry.available()
    }

    /// Templates of all enabled providers, keyed `<plugin name>/<template name>`
    pub async fn templates(&self) -> BTreeMap<String, String> {
        let active = self.active_plugins().await;
        let mut templates = BTreeMap::new();

        for (id, plugin) in active {
            let Some(provider) = plugin.as_template_provider() else {
                continue;
            };

            match provider.templates().instrument(self.span.clone()).await {
                Ok(entries) => {
                    let name = &plugin.metadata().name;
                    templates.extend(
                        entries
                            .into_iter()
                            .map(|(template, source)| (format!("{}/{}", name, template), source)),
                    );
                }
                Err(e) => {
                    warn!(plugin_id = %id, error = %e, "Skipping templates of failing plugin");
                }
            }
        }

        templates
    }

    /// Look up one template by its namespaced key
    pub async fn template(&self, key: &str) -> Option<String> {
        self.templates().await.remove(key)
    }

    /// Models of all enabled providers, keyed `<plugin name>/<model id>`
    pub async fn models(&self) -> BTreeMap<String, ModelInfo> {
        let active = self.active_plugins().await;
        let mut models = BTreeMap::new();

        for (id, plugin) in active {
            let Some(provider) = plugin.as_model_provider() else {
                continue;
            };

            match provider.models().instrument(self.span.clone()).await {
                Ok(entries) => {
                    let name = &plugin.metadata().name;
                    models.extend(
                        entries
                            .into_iter()
                            .map(|model| (format!("{}/{}", name, model.id), model)),
                    );
                }
                Err(e) => {
                    warn!(plugin_id = %id, error = %e, "Skipping models of failing plugin");
                }
            }
        }

        models
    }

    /// Provider presets contributed by enabled model providers
    pub async fn provider_presets(&self) -> Vec<ProviderPreset> {
        self.active_plugins()
            .await
            .values()
            .filter_map(|plugin| plugin.as_model_provider()?.provider_preset())
            .collect()
    }

    async fn discover_and_auto_enable(&self, state: &mut ManagerState) -> DiscoveryReport {
        let report = state.registry.discover(&self.search_paths);
        state.lifecycle.clear();

        for descriptor in state.linked.clone() {
            state.registry.register_descriptor(descriptor);
        }

        for id in state.registry.ids() {
            let persisted = self.load_state(&id);
            if persisted.auto_enable {
                debug!(plugin_id = %id, "Auto-enabling plugin");
                self.activate(state, &id, true).await;
            }
        }

        report
    }

    async fn activate(&self, state: &mut ManagerState, plugin_id: &str, auto_enable: bool) -> bool {
        if state.active.contains_key(plugin_id) {
            debug!(plugin_id = %plugin_id, "Plugin already enabled");
            return true;
        }

        if let Err(e) = state.registry.validate_dependencies(plugin_id) {
            warn!(plugin_id = %plugin_id, error = %e, "Cannot enable plugin");
            return false;
        }

        let plugin = match state.registry.create_instance(plugin_id) {
            Ok(plugin) => plugin,
            Err(e) => {
                warn!(plugin_id = %plugin_id, error = %e, "Cannot enable plugin");
                return false;
            }
        };

        let persisted = self.load_state(plugin_id);
        let context = PluginContext::new(plugin_id)
            .with_config(persisted.config.clone())
            .with_host_version(state.registry.host_version());

        state
            .lifecycle
            .insert(plugin_id.to_string(), PluginLifecycle::Initializing);

        if let Err(e) = plugin.initialize(context).await {
            state.lifecycle.remove(plugin_id);
            error!(plugin_id = %plugin_id, error = %e, "Plugin initialization failed");
            return false;
        }

        state.lifecycle.remove(plugin_id);
        state.active.insert(plugin_id.to_string(), plugin);

        let record = PluginState {
            enabled: true,
            auto_enable,
            config: persisted.config,
        };
        if let Err(e) = record.save(self.settings.as_ref(), plugin_id) {
            warn!(plugin_id = %plugin_id, error = %e, "Failed to persist plugin state");
        }

        info!(plugin_id = %plugin_id, auto_enable, "Plugin enabled");
        true
    }

    async fn deactivate(&self, state: &mut ManagerState, plugin_id: &str, persist: bool) -> bool {
        let Some(plugin) = state.active.remove(plugin_id) else {
            debug!(plugin_id = %plugin_id, "Plugin not active");
            return true;
        };

        state
            .lifecycle
            .insert(plugin_id.to_string(), PluginLifecycle::Disabled);

        let cleaned = match plugin.cleanup().await {
            Ok(()) => true,
            Err(e) => {
                error!(plugin_id = %plugin_id, error = %e, "Plugin cleanup failed");
                false
            }
        };

        if persist {
            let record = PluginState {
                enabled: false,
                ..self.load_state(plugin_id)
            };
            if let Err(e) = record.save(self.settings.as_ref(), plugin_id) {
                warn!(plugin_id = %plugin_id, error = %e, "Failed to persist plugin state");
            }
        }

        info!(plugin_id = %plugin_id, "Plugin disabled");
        cleaned
    }

    fn load_state(&self, plugin_id: &str) -> PluginState {
        PluginState::load(self.settings.as_ref(), plugin_id).unwrap_or_else(|e| {
            warn!(plugin_id = %plugin_id, error = %e, "Ignoring unreadable plugin state");
            PluginState::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plugin::{
        Capability, PluginError, PluginSource, TemplateProvider,
    };
    use crate::infrastructure::settings::InMemorySettingsStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct Counters {
        initialized: AtomicUsize,
        cleaned: AtomicUsize,
    }

    #[derive(Debug)]
    struct CountingPlugin {
        metadata: PluginMetadata,
        counters: Arc<Counters>,
        fail_init: bool,
        fail_templates: bool,
    }

    #[async_trait]
    impl Plugin for CountingPlugin {
        fn metadata(&self) -> &PluginMetadata {
            &self.metadata
        }

        fn capabilities(&self) -> Vec<Capability> {
            vec![Capability::TemplateProvider]
        }

        async fn initialize(&self, context: PluginContext) -> Result<(), PluginError> {
            self.counters.initialized.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                return Err(PluginError::initialization(context.plugin_id, "boom"));
            }
            Ok(())
        }

        async fn cleanup(&self) -> Result<(), PluginError> {
            self.counters.cleaned.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn as_template_provider(&self) -> Option<&dyn TemplateProvider> {
            Some(self)
        }
    }

    #[async_trait]
    impl TemplateProvider for CountingPlugin {
        async fn templates(&self) -> Result<HashMap<String, String>, PluginError> {
            if self.fail_templates {
                return Err(PluginError::capability(&self.metadata.name, "unreadable"));
            }
            Ok(HashMap::from([(
                "main".to_string(),
                format!("# {}", self.metadata.name),
            )]))
        }
    }

    fn counting_descriptor(
        id: &str,
        name: &str,
        counters: Arc<Counters>,
        fail_init: bool,
        fail_templates: bool,
    ) -> PluginDescriptor {
        let metadata = PluginMetadata::new(name, "1.0.0");
        let instance_metadata = metadata.clone();

        PluginDescriptor::new(
            id,
            metadata,
            vec![Capability::TemplateProvider],
            PluginSource::Builtin,
            move || {
                Ok(Arc::new(CountingPlugin {
                    metadata: instance_metadata.clone(),
                    counters: counters.clone(),
                    fail_init,
                    fail_templates,
                }) as Arc<dyn Plugin>)
            },
        )
    }

    fn manager_with(settings: Arc<InMemorySettingsStore>) -> PluginManager {
        PluginManager::new(PluginRegistry::new().with_builtins(false), settings, Vec::new())
    }

    #[tokio::test]
    async fn test_enable_twice_initializes_once() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(Arc::new(InMemorySettingsStore::new()));
        manager
            .register_descriptor(counting_descriptor("test.Plugin", "Test", counters.clone(), false, false))
            .await;

        assert!(manager.enable("test.Plugin", false).await);
        assert!(manager.enable("test.Plugin", false).await);

        assert_eq!(counters.initialized.load(Ordering::SeqCst), 1);
        assert_eq!(manager.lifecycle("test.Plugin").await, PluginLifecycle::Enabled);
    }

    #[tokio::test]
    async fn test_enable_disable_enable_cycle() {
        let counters = Arc::new(Counters::default());
        let settings = Arc::new(InMemorySettingsStore::new());
        let manager = manager_with(settings.clone());
        manager
            .register_descriptor(counting_descriptor("test.Plugin", "Test", counters.clone(), false, false))
            .await;

        assert_eq!(manager.lifecycle("test.Plugin").await, PluginLifecycle::Discovered);

        assert!(manager.enable("test.Plugin", true).await);
        assert!(manager.disable("test.Plugin").await);
        assert_eq!(manager.lifecycle("test.Plugin").await, PluginLifecycle::Disabled);

        let persisted = PluginState::load(settings.as_ref(), "test.Plugin").unwrap();
        assert!(!persisted.enabled);
        assert!(persisted.auto_enable);

        assert!(manager.enable("test.Plugin", true).await);

        assert_eq!(counters.initialized.load(Ordering::SeqCst), 2);
        assert_eq!(counters.cleaned.load(Ordering::SeqCst), 1);
        assert!(PluginState::load(settings.as_ref(), "test.Plugin").unwrap().enabled);
    }

    #[tokio::test]
    async fn test_disable_inactive_is_noop() {
        let manager = manager_with(Arc::new(InMemorySettingsStore::new()));

        assert!(manager.disable("never.Enabled").await);
        assert_eq!(manager.lifecycle("never.Enabled").await, PluginLifecycle::Undiscovered);
    }

    #[tokio::test]
    async fn test_failed_initialization_stays_discovered() {
        let counters = Arc::new(Counters::default());
        let settings = Arc::new(InMemorySettingsStore::new());
        let manager = manager_with(settings.clone());
        manager
            .register_descriptor(counting_descriptor("bad.Plugin", "Bad", counters.clone(), true, false))
            .await;

        assert!(!manager.enable("bad.Plugin", true).await);

        assert_eq!(manager.lifecycle("bad.Plugin").await, PluginLifecycle::Discovered);
        assert!(manager.active_plugins().await.is_empty());
        assert!(settings.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_plugin_cannot_be_enabled() {
        let manager = manager_with(Arc::new(InMemorySettingsStore::new()));

        assert!(!manager.enable("missing.Plugin", false).await);
    }

    #[tokio::test]
    async fn test_templates_skip_failing_provider() {
        let manager = manager_with(Arc::new(InMemorySettingsStore::new()));
        let counters = Arc::new(Counters::default());
        manager
            .register_descriptor(counting_descriptor("good.Plugin", "Good", counters.clone(), false, false))
            .await;
        manager
            .register_descriptor(counting_descriptor("flaky.Plugin", "Flaky", counters.clone(), false, true))
            .await;

        assert!(manager.enable("good.Plugin", false).await);
        assert!(manager.enable("flaky.Plugin", false).await);

        let templates = manager.templates().await;

        assert_eq!(templates.len(), 1);
        assert_eq!(templates["Good/main"], "# Good");
        assert_eq!(manager.template("Good/main").await.as_deref(), Some("# Good"));
        assert!(manager.template("Flaky/main").await.is_none());
    }

    #[tokio::test]
    async fn test_reload_reenables_auto_enabled_plugins() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(Arc::new(InMemorySettingsStore::new()));
        manager
            .register_descriptor(counting_descriptor("auto.Plugin", "Auto", counters.clone(), false, false))
            .await;
        manager
            .register_descriptor(counting_descriptor("manual.Plugin", "Manual", counters.clone(), false, false))
            .await;

        assert!(manager.enable("auto.Plugin", true).await);
        assert!(manager.enable("manual.Plugin", false).await);

        manager.reload().await;

        let active = manager.active_plugins().await;
        assert_eq!(active.keys().collect::<Vec<_>>(), vec!["auto.Plugin"]);
        assert_eq!(manager.lifecycle("manual.Plugin").await, PluginLifecycle::Discovered);
        assert_eq!(counters.cleaned.load(Ordering::SeqCst), 2);
        assert_eq!(counters.initialized.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_and_keeps_persisted_state() {
        let counters = Arc::new(Counters::default());
        let settings = Arc::new(InMemorySettingsStore::new());
        let manager = manager_with(settings.clone());
        manager
            .register_descriptor(counting_descriptor("test.Plugin", "Test", counters.clone(), false, false))
            .await;
        assert!(manager.enable("test.Plugin", true).await);

        manager.shutdown().await;
        manager.shutdown().await;

        assert_eq!(counters.cleaned.load(Ordering::SeqCst), 1);
        assert!(manager.active_plugins().await.is_empty());
        assert!(PluginState::load(settings.as_ref(), "test.Plugin").unwrap().enabled);
    }

    #[tokio::test]
    async fn test_start_with_builtins_and_units() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("flask.toml"),
            r#"
[plugins.Templates]
kind = "template_provider"
name = "Flask"

[plugins.Templates.templates]
app = "from flask import Flask"
"#,
        )
        .unwrap();

        let settings = Arc::new(InMemorySettingsStore::new());
        PluginState {
            enabled: true,
            auto_enable: true,
            config: HashMap::new(),
        }
        .save(settings.as_ref(), "flask.Templates")
        .unwrap();
        PluginState {
            enabled: true,
            auto_enable: true,
            config: HashMap::new(),
        }
        .save(settings.as_ref(), "openrouter.OpenRouterCatalog")
        .unwrap();

        let manager = PluginManager::new(
            PluginRegistry::new(),
            settings,
            vec![dir.path().to_path_buf()],
        );
        let report = manager.start().await;

        assert_eq!(report.registered.len(), 4);
        assert_eq!(
            manager.lifecycle("fastapi.FastApiTemplates").await,
            PluginLifecycle::Discovered
        );

        let templates = manager.templates().await;
        assert_eq!(templates["Flask/app"], "from flask import Flask");
        assert!(!templates.contains_key("FastAPI/fastapi_main"));

        let models = manager.models().await;
        assert!(models.contains_key("OpenRouter/deepseek/deepseek-coder"));

        let presets = manager.provider_presets().await;
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].id, "openrouter");
    }
}
