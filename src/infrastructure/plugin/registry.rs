//! Plugin Registry
//!
//! Maps registry ids to plugin descriptors. Descriptors come from the
//! built-in catalog and from declarative units found on disk.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Span, debug, info, warn};

use super::builtin::builtin_descriptors;
use super::loader::scan_directory;
use crate::domain::plugin::{
    Capability, Plugin, PluginDescriptor, PluginError, PluginMetadata, satisfies_min_version,
};

/// Capability names available to every plugin
pub const DEFAULT_HOST_CAPABILITIES: &[&str] = &["templates", "models"];

/// Result of one discovery pass
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Ids registered during the pass, in registration order
    pub registered: Vec<String>,
    /// Units that failed to load
    pub errors: Vec<PluginError>,
}

/// Central registry of discoverable plugins
#[derive(Debug)]
pub struct PluginRegistry {
    descriptors: BTreeMap<String, PluginDescriptor>,
    host_capabilities: HashSet<String>,
    host_version: String,
    include_builtins: bool,
    span: Span,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    /// Create an empty registry with the default host capabilities
    pub fn new() -> Self {
        Self {
            descriptors: BTreeMap::new(),
            host_capabilities: DEFAULT_HOST_CAPABILITIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            host_version: env!("CARGO_PKG_VERSION").to_string(),
            include_builtins: true,
            span: Span::none(),
        }
    }

    pub fn with_host_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.host_capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_host_version(mut self, version: impl Into<String>) -> Self {
        self.host_version = version.into();
        self
    }

    /// Whether `discover` registers the compiled-in plugins
    pub fn with_builtins(mut self, include_builtins: bool) -> Self {
        self.include_builtins = include_builtins;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    /// Rebuild the registry from the built-in catalog and `paths`, in order.
    ///
    /// The previous contents are replaced. A unit that fails to load is
    /// reported and skipped.
    pub fn discover(&mut self, paths: &[PathBuf]) -> DiscoveryReport {
        let span = self.span.clone();
        let _guard = span.enter();
        let mut report = DiscoveryReport::default();

        self.descriptors.clear();

        if self.include_builtins {
            for descriptor in builtin_descriptors() {
                report.registered.push(descriptor.id().to_string());
                self.insert(descriptor);
            }
        }

        for path in paths {
            let scan = scan_directory(path);

            for descriptor in scan.descriptors {
                report.registered.push(descriptor.id().to_string());
                self.insert(descriptor);
            }

            report.errors.extend(scan.errors);
        }

        info!(
            registered = report.registered.len(),
            failed = report.errors.len(),
            "Plugin discovery complete"
        );

        report
    }

    /// Register a descriptor outside of discovery
    pub fn register_descriptor(&mut self, descriptor: PluginDescriptor) {
        let span = self.span.clone();
        let _guard = span.enter();
        self.insert(descriptor);
    }

    fn insert(&mut self, descriptor: PluginDescriptor) {
        let metadata = descriptor.metadata();

        info!(
            plugin_id = %descriptor.id(),
            plugin_name = %metadata.name,
            plugin_version = %metadata.version,
            source = %descriptor.source(),
            "Registering plugin"
        );

        if let Some(previous) = self.descriptors.insert(descriptor.id().to_string(), descriptor) {
            warn!(
                plugin_id = %previous.id(),
                source = %previous.source(),
                "Plugin id registered twice, keeping the later one"
            );
        }
    }

    pub fn get(&self, plugin_id: &str) -> Option<&PluginDescriptor> {
        self.descriptors.get(plugin_id)
    }

    pub fn contains(&self, plugin_id: &str) -> bool {
        self.descriptors.contains_key(plugin_id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.descriptors.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Construct a fresh instance of a registered plugin
    pub fn create_instance(&self, plugin_id: &str) -> Result<Arc<dyn Plugin>, PluginError> {
        let descriptor = self
            .descriptors
            .get(plugin_id)
            .ok_or_else(|| PluginError::not_found(plugin_id))?;

        descriptor.instantiate().inspect_err(|e| {
            warn!(plugin_id = %plugin_id, error = %e, "Plugin construction failed");
        })
    }

    /// Metadata of every registered plugin, without instantiating any
    pub fn available(&self) -> BTreeMap<String, PluginMetadata> {
        self.descriptors
            .iter()
            .map(|(id, descriptor)| (id.clone(), descriptor.metadata().clone()))
            .collect()
    }

    pub fn ids_with_capability(&self, capability: Capability) -> Vec<String> {
        self.descriptors
            .values()
            .filter(|d| d.has_capability(capability))
            .map(|d| d.id().to_string())
            .collect()
    }

    /// Check host version and declared dependencies
    pub fn validate_dependencies(&self, plugin_id: &str) -> Result<(), PluginError> {
        let descriptor = self
            .descriptors
            .get(plugin_id)
            .ok_or_else(|| PluginError::not_found(plugin_id))?;
        let metadata = descriptor.metadata();

        if let Some(required) = &metadata.min_host_version {
            if !satisfies_min_version(&self.host_version, required) {
                return Err(PluginError::incompatible_host(
                    plugin_id,
                    required,
                    &self.host_version,
                ));
            }
        }

        for dependency in &metadata.dependencies {
            if !self.resolves(dependency) {
                debug!(plugin_id = %plugin_id, dependency = %dependency, "Unresolved dependency");
                return Err(PluginError::dependency_missing(plugin_id, dependency));
            }
        }

        Ok(())
    }

    pub fn dependencies_satisfied(&self, plugin_id: &str) -> bool {
        self.validate_dependencies(plugin_id).is_ok()
    }

    /// A dependency is a host capability, a plugin id or a plugin name
    fn resolves(&self, dependency: &str) -> bool {
        self.host_capabilities.contains(dependency)
            || self.descriptors.contains_key(dependency)
            || self
                .descriptors
                .values()
                .any(|d| d.metadata().name == dependency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plugin::{PluginContext, PluginSource};
    use async_trait::async_trait;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct MockPlugin {
        metadata: PluginMetadata,
    }

    #[async_trait]
    impl Plugin for MockPlugin {
        fn metadata(&self) -> &PluginMetadata {
            &self.metadata
        }

        fn capabilities(&self) -> Vec<Capability> {
            vec![Capability::TemplateProvider]
        }

        async fn initialize(&self, _context: PluginContext) -> Result<(), PluginError> {
            Ok(())
        }

        async fn cleanup(&self) -> Result<(), PluginError> {
            Ok(())
        }
    }

    fn mock_descriptor(id: &str, metadata: PluginMetadata) -> PluginDescriptor {
        let instance_metadata = metadata.clone();
        PluginDescriptor::new(
            id,
            metadata,
            vec![Capability::TemplateProvider],
            PluginSource::Builtin,
            move || {
                Ok(Arc::new(MockPlugin {
                    metadata: instance_metadata.clone(),
                }) as Arc<dyn Plugin>)
            },
        )
    }

    fn unit(name: &str) -> String {
        format!(
            r#"
[plugins.Pack]
kind = "template_provider"
name = "{name}"

[plugins.Pack.templates]
main = "print('{name}')"
"#
        )
    }

    #[test]
    fn test_discover_builtins_then_directories() {
        let user = TempDir::new().unwrap();
        let system = TempDir::new().unwrap();
        std::fs::write(user.path().join("flask.toml"), unit("Flask")).unwrap();
        std::fs::write(system.path().join("vue.toml"), unit("Vue")).unwrap();

        let mut registry = PluginRegistry::new();
        let report = registry.discover(&[user.path().to_path_buf(), system.path().to_path_buf()]);

        assert_eq!(
            report.registered,
            vec![
                "fastapi.FastApiTemplates",
                "django.DjangoTemplates",
                "openrouter.OpenRouterCatalog",
                "flask.Pack",
                "vue.Pack"
            ]
        );
        assert!(report.errors.is_empty());
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_discovery_isolates_broken_unit() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("one.toml"), unit("One")).unwrap();
        std::fs::write(dir.path().join("two.toml"), "this is = = not toml").unwrap();
        std::fs::write(dir.path().join("three.toml"), unit("Three")).unwrap();

        let mut registry = PluginRegistry::new().with_builtins(false);
        let report = registry.discover(&[dir.path().to_path_buf()]);

        assert_eq!(registry.ids(), vec!["one.Pack", "three.Pack"]);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_rediscover_replaces_previous_map() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("one.toml"), unit("One")).unwrap();

        let mut registry = PluginRegistry::new().with_builtins(false);
        registry.register_descriptor(mock_descriptor("manual.Entry", PluginMetadata::new("M", "1")));
        registry.discover(&[dir.path().to_path_buf()]);

        assert!(!registry.contains("manual.Entry"));
        assert!(registry.contains("one.Pack"));
    }

    #[test]
    fn test_available_and_capability_index() {
        let mut registry = PluginRegistry::new();
        registry.discover(&[]);

        let available = registry.available();
        assert_eq!(available["django.DjangoTemplates"].name, "Django");
        assert_eq!(
            registry.ids_with_capability(Capability::ModelProvider),
            vec!["openrouter.OpenRouterCatalog"]
        );
        assert_eq!(registry.ids_with_capability(Capability::TemplateProvider).len(), 2);
    }

    #[test]
    fn test_create_instance() {
        let mut registry = PluginRegistry::new().with_builtins(false);
        registry.register_descriptor(mock_descriptor("test.Plugin", PluginMetadata::new("T", "1")));

        let plugin = registry.create_instance("test.Plugin").unwrap();
        assert_eq!(plugin.metadata().name, "T");

        assert!(matches!(
            registry.create_instance("missing.Plugin"),
            Err(PluginError::NotFound { .. })
        ));
    }

    #[test]
    fn test_dependencies_resolve_by_capability_id_or_name() {
        let mut registry = PluginRegistry::new().with_builtins(false);
        registry.register_descriptor(mock_descriptor("base.Core", PluginMetadata::new("Core", "1")));
        registry.register_descriptor(mock_descriptor(
            "ext.ById",
            PluginMetadata::new("ById", "1").with_dependency("base.Core"),
        ));
        registry.register_descriptor(mock_descriptor(
            "ext.ByName",
            PluginMetadata::new("ByName", "1")
                .with_dependency("Core")
                .with_dependency("templates"),
        ));
        registry.register_descriptor(mock_descriptor(
            "ext.Missing",
            PluginMetadata::new("Missing", "1").with_dependency("database"),
        ));

        assert!(registry.dependencies_satisfied("ext.ById"));
        assert!(registry.dependencies_satisfied("ext.ByName"));
        assert!(matches!(
            registry.validate_dependencies("ext.Missing"),
            Err(PluginError::DependencyMissing { .. })
        ));
    }

    #[test]
    fn test_min_host_version() {
        let mut registry = PluginRegistry::new()
            .with_builtins(false)
            .with_host_version("1.2.0");
        registry.register_descriptor(mock_descriptor(
            "ok.Plugin",
            PluginMetadata::new("Ok", "1").with_min_host_version("1.1"),
        ));
        registry.register_descriptor(mock_descriptor(
            "new.Plugin",
            PluginMetadata::new("New", "1").with_min_host_version("2.0.0"),
        ));

        assert!(registry.dependencies_satisfied("ok.Plugin"));
        assert!(matches!(
            registry.validate_dependencies("new.Plugin"),
            Err(PluginError::IncompatibleHost { .. })
        ));
    }
}
