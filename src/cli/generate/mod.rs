//! Generate command - runs a prompt through the fallback chain

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, ValueEnum};
use futures::StreamExt;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{AppConfig, TargetConfig};
use crate::domain::chain::RouterError;
use crate::domain::llm::{GenerationRequest, ProviderClient};
use crate::domain::settings::SettingsStore;
use crate::infrastructure::llm::LlmClientFactory;
use crate::infrastructure::plugin::PluginManager;

/// Arguments for the generate command
#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    /// Description of the code to generate
    #[arg(long)]
    pub prompt: String,

    /// Comma-separated providers, tried in order (defaults to configured targets)
    #[arg(long, value_delimiter = ',')]
    pub provider: Vec<String>,

    /// Comma-separated models, same order as providers
    #[arg(long, value_delimiter = ',')]
    pub model: Vec<String>,

    /// Comma-separated API keys, same order as providers
    #[arg(long, value_delimiter = ',')]
    pub api_key: Vec<String>,

    /// Comma-separated API base URLs, same order as providers
    #[arg(long, value_delimiter = ',')]
    pub api_base: Vec<String>,

    /// Print chunks as they arrive
    #[arg(long)]
    pub stream: bool,

    /// System prompt (overrides config)
    #[arg(long)]
    pub system: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    pub format: OutputFormat,

    /// Also write the output to this file
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Markdown,
    Py,
}

/// Run the generate command
pub async fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();
    let settings = super::open_settings(&config);
    let plugins = super::start_plugins(&config, settings.clone()).await;

    let generated = super::shutdown_after(
        &plugins,
        generate(&args, &config, settings.as_ref(), &plugins),
    )
    .await?;

    let Some(code) = generated else {
        return Ok(());
    };

    let output = format_output(&code, args.format);
    println!("{}", output);

    if let Some(path) = &args.out {
        std::fs::write(path, &output)
            .with_context(|| format!("Cannot write {}", path.display()))?;
        eprintln!("[Saved to {}]", path.display());
    }

    Ok(())
}

/// Route the prompt; `None` when the text was already streamed to stdout
async fn generate(
    args: &GenerateArgs,
    config: &AppConfig,
    settings: &dyn SettingsStore,
    plugins: &PluginManager,
) -> anyhow::Result<Option<String>> {
    let targets = if args.provider.is_empty() {
        config.targets.clone()
    } else {
        targets_from_args(args)
    };

    let chain = LlmClientFactory::build_chain(&targets, &config.generation, settings)
        .context("Cannot build the provider chain")?;

    let client: Arc<dyn ProviderClient> = Arc::new(LlmClientFactory::create_client(
        config,
        plugins.provider_presets().await,
    ));
    let router = LlmClientFactory::create_router(config, client);
    let request = build_request(args, config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    if args.stream && args.format == OutputFormat::Plain {
        stream_to_stdout(router.spawn_stream(chain, request, cancel)).await
    } else if args.stream {
        // Formatting needs the whole text
        let mut items = router.spawn_stream(chain, request, cancel);
        let mut code = String::new();
        while let Some(item) = items.next().await {
            code.push_str(&item?.text);
        }
        Ok(Some(code))
    } else {
        let outcome = router.generate(&chain, &request, &cancel).await?;
        info!(
            target_id = %outcome.target_id,
            skipped = outcome.failures.len(),
            "Generation succeeded"
        );
        Ok(Some(outcome.value))
    }
}

/// Print chunks as they arrive; returns `None` because the text is already out
async fn stream_to_stdout<S>(mut items: S) -> anyhow::Result<Option<String>>
where
    S: futures::Stream<Item = Result<crate::domain::llm::StreamChunk, RouterError>> + Unpin,
{
    let mut stdout = std::io::stdout();

    while let Some(item) = items.next().await {
        match item {
            Ok(chunk) => {
                stdout.write_all(chunk.text.as_bytes())?;
                stdout.flush()?;
            }
            Err(e @ RouterError::StreamInterrupted { .. }) => {
                writeln!(stdout)?;
                warn!(error = %e, "Output is incomplete");
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        }
    }

    writeln!(stdout)?;
    Ok(None)
}

fn build_request(args: &GenerateArgs, config: &AppConfig) -> GenerationRequest {
    let mut request = GenerationRequest::new(&args.prompt)
        .with_max_tokens(config.generation.max_tokens)
        .with_temperature(config.generation.temperature);

    if let Some(system) = args.system.as_ref().or(config.generation.system_prompt.as_ref()) {
        request = request.with_system_prompt(system);
    }

    request
}

/// Pair the comma lists by position. Missing models repeat the last one;
/// missing keys and base URLs fall back to configuration.
pub fn targets_from_args(args: &GenerateArgs) -> Vec<TargetConfig> {
    let pick = |values: &[String], index: usize| {
        values
            .get(index)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    args.provider
        .iter()
        .enumerate()
        .map(|(i, provider)| TargetConfig {
            provider: provider.trim().to_string(),
            model: pick(&args.model, i)
                .or_else(|| args.model.last().map(|m| m.trim().to_string()))
                .unwrap_or_default(),
            api_key: pick(&args.api_key, i),
            api_key_env: None,
            base_url: pick(&args.api_base, i),
            timeout_secs: None,
        })
        .collect()
}

pub fn format_output(code: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => code.to_string(),
        OutputFormat::Markdown => format!("```python\n{}\n```", code),
        OutputFormat::Py => {
            let trimmed = code.trim_start();
            if trimmed.starts_with("def ") || trimmed.starts_with("class ") {
                code.to_string()
            } else {
                format!("# Generated code\n{}", code)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(provider: &[&str], model: &[&str], api_key: &[&str], api_base: &[&str]) -> GenerateArgs {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        GenerateArgs {
            prompt: "fizzbuzz".into(),
            provider: owned(provider),
            model: owned(model),
            api_key: owned(api_key),
            api_base: owned(api_base),
            stream: false,
            system: None,
            format: OutputFormat::Plain,
            out: None,
        }
    }

    #[test]
    fn test_lists_pair_by_position() {
        let targets = targets_from_args(&args(
            &["openrouter", "groq"],
            &["deepseek/deepseek-coder", "llama3-70b-8192"],
            &["k1", "k2"],
            &["", "https://proxy.example/v1"],
        ));

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].model, "deepseek/deepseek-coder");
        assert_eq!(targets[0].api_key.as_deref(), Some("k1"));
        assert_eq!(targets[0].base_url, None);
        assert_eq!(targets[1].provider, "groq");
        assert_eq!(targets[1].base_url.as_deref(), Some("https://proxy.example/v1"));
    }

    #[test]
    fn test_short_lists_fall_back() {
        let targets = targets_from_args(&args(&["openrouter", "openai"], &["gpt-4o-mini"], &[], &[]));

        assert_eq!(targets[1].model, "gpt-4o-mini");
        assert_eq!(targets[1].api_key, None);
    }

    #[test]
    fn test_format_output() {
        assert_eq!(format_output("x = 1", OutputFormat::Plain), "x = 1");
        assert_eq!(
            format_output("x = 1", OutputFormat::Markdown),
            "```python\nx = 1\n```"
        );
        assert_eq!(format_output("def f(): pass", OutputFormat::Py), "def f(): pass");
        assert_eq!(
            format_output("x = 1", OutputFormat::Py),
            "# Generated code\nx = 1"
        );
    }

    #[test]
    fn test_request_uses_cli_system_prompt() {
        let mut cli_args = args(&["openrouter"], &["m"], &[], &[]);
        cli_args.system = Some("Write Python only".into());

        let request = build_request(&cli_args, &AppConfig::default());

        assert_eq!(request.system_prompt.as_deref(), Some("Write Python only"));
        assert_eq!(request.max_tokens, 2048);
    }
}
