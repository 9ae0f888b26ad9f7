//! Built-in Plugins
//!
//! Plugins compiled into the host. Each module exposes a `descriptor()` entry
//! point; the catalog below lists them in registration order.

pub mod django;
pub mod fastapi;
pub mod openrouter;

pub use django::DjangoPlugin;
pub use fastapi::FastApiPlugin;
pub use openrouter::OpenRouterPlugin;

use crate::domain::plugin::PluginDescriptor;

/// Entry points of every built-in plugin
pub const CATALOG: &[fn() -> PluginDescriptor] = &[
    fastapi::descriptor,
    django::descriptor,
    openrouter::descriptor,
];

pub fn builtin_descriptors() -> Vec<PluginDescriptor> {
    CATALOG.iter().map(|entry| entry()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plugin::{Capability, PluginSource};

    #[test]
    fn test_builtin_catalog() {
        let descriptors = builtin_descriptors();

        let ids: Vec<_> = descriptors.iter().map(|d| d.id()).collect();
        assert_eq!(
            ids,
            vec![
                "fastapi.FastApiTemplates",
                "django.DjangoTemplates",
                "openrouter.OpenRouterCatalog"
            ]
        );
        assert!(descriptors.iter().all(|d| *d.source() == PluginSource::Builtin));
        assert!(descriptors[2].has_capability(Capability::ModelProvider));
    }
}
