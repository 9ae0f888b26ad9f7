//! Plugin descriptors - registry entries mapping an id to a constructor

use super::entity::{Plugin, PluginMetadata};
use super::error::PluginError;
use super::extensions::Capability;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Builds a fresh plugin instance
pub type PluginConstructor =
    Arc<dyn Fn() -> Result<Arc<dyn Plugin>, PluginError> + Send + Sync>;

/// Where a descriptor came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    /// Compiled into the host
    Builtin,
    /// Declarative unit found on disk
    File(PathBuf),
}

impl fmt::Display for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginSource::Builtin => write!(f, "builtin"),
            PluginSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A discovered plugin entry. Metadata is available without instantiating.
#[derive(Clone)]
pub struct PluginDescriptor {
    id: String,
    metadata: PluginMetadata,
    capabilities: Vec<Capability>,
    source: PluginSource,
    constructor: PluginConstructor,
}

impl PluginDescriptor {
    pub fn new<F>(
        id: impl Into<String>,
        metadata: PluginMetadata,
        capabilities: Vec<Capability>,
        source: PluginSource,
        constructor: F,
    ) -> Self
    where
        F: Fn() -> Result<Arc<dyn Plugin>, PluginError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            metadata,
            capabilities,
            source,
            constructor: Arc::new(constructor),
        }
    }

    /// Registry id, `<module>.<entry name>`
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn source(&self) -> &PluginSource {
        &self.source
    }

    /// Construct a new instance
    pub fn instantiate(&self) -> Result<Arc<dyn Plugin>, PluginError> {
        (self.constructor)()
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("id", &self.id)
            .field("metadata", &self.metadata)
            .field("capabilities", &self.capabilities)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
