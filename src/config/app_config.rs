use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub generation: GenerationConfig,
    pub retry: RetrySettings,
    pub plugins: PluginsConfig,
    /// Default fallback chain, tried in order
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Buffered characters before a stream chunk is released
    pub flush_threshold: usize,
    /// Pause between two fallback targets
    pub fallback_delay_ms: u64,
    /// Capacity of the streaming channel
    pub stream_buffer: usize,
    pub request_timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: Option<String>,
    /// Sent as `HTTP-Referer`
    pub app_referer: String,
    /// Sent as `X-Title`
    pub app_title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Register the compiled-in plugins
    pub builtin_enabled: bool,
    /// Per-user plugin directory; defaults to `~/.pmp-codegen/plugins`
    pub user_dir: Option<PathBuf>,
    /// Scanned after the user directory
    pub system_dirs: Vec<PathBuf>,
    /// Defaults to `~/.pmp-codegen/settings.json`
    pub settings_file: Option<PathBuf>,
    /// Capability names plugins may list as dependencies
    pub host_capabilities: Vec<String>,
}

/// One element of the configured fallback chain
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            flush_threshold: 40,
            fallback_delay_ms: 1000,
            stream_buffer: 64,
            request_timeout_secs: 60,
            max_tokens: 2048,
            temperature: 0.7,
            system_prompt: None,
            app_referer: "http://localhost".to_string(),
            app_title: "PMP Codegen".to_string(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 30_000,
        }
    }
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            builtin_enabled: true,
            user_dir: None,
            system_dirs: Vec::new(),
            settings_file: None,
            host_capabilities: vec!["templates".to_string(), "models".to_string()],
        }
    }
}

impl PluginsConfig {
    /// User directory first, then system directories
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(user_dir) = self.user_dir.clone().or_else(default_user_plugin_dir) {
            paths.push(user_dir);
        }

        paths.extend(self.system_dirs.iter().cloned());
        paths
    }

    pub fn settings_path(&self) -> Option<PathBuf> {
        self.settings_file.clone().or_else(default_settings_file)
    }
}

/// `~/.pmp-codegen`
pub fn app_home_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pmp-codegen"))
}

fn default_user_plugin_dir() -> Option<PathBuf> {
    app_home_dir().map(|dir| dir.join("plugins"))
}

fn default_settings_file() -> Option<PathBuf> {
    app_home_dir().map(|dir| dir.join("settings.json"))
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
