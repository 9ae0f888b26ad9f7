//! Settings domain - persistence contract for plugin and provider state

mod error;
mod plugin_state;
mod store;

pub use error::SettingsError;
pub use plugin_state::PluginState;
pub use store::{SettingsStore, provider_api_key_key};

#[cfg(test)]
pub use store::MockSettingsStore;
