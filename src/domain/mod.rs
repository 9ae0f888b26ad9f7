//! Domain layer - Core entities, traits and routing logic

pub mod chain;
pub mod llm;
pub mod plugin;
pub mod settings;

pub use chain::{
    CommittedStream, FallbackAttempt, FallbackChain, FallbackOutcome, FallbackRouter,
    FallbackRouterConfig, RouterError,
};
pub use llm::{
    ChunkStream, GenerationRequest, Message, MessageRole, ModelInfo, ProviderClient,
    ProviderError, ProviderPreset, ProviderPresets, StreamChunk, Target,
};
pub use plugin::{
    Capability, ModelProvider, Plugin, PluginContext, PluginDescriptor, PluginError,
    PluginLifecycle, PluginMetadata, PluginSource, TemplateProvider,
};
pub use settings::{PluginState, SettingsError, SettingsStore};
