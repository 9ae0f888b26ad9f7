//! Template provider capability

use super::entity::Plugin;
use super::error::PluginError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Plugins contributing code-generation templates.
///
/// Keys are template names local to the plugin; the manager namespaces them
/// as `<plugin name>/<template name>`.
#[async_trait]
pub trait TemplateProvider: Plugin {
    async fn templates(&self) -> Result<HashMap<String, String>, PluginError>;
}
