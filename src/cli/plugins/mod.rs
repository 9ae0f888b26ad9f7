//! Plugins command - list, enable and disable plugins

use clap::Subcommand;

use crate::domain::plugin::PluginLifecycle;

#[derive(Subcommand, Clone, Debug)]
pub enum PluginsCommand {
    /// List discovered plugins with their state
    List,

    /// Enable a plugin by registry id
    Enable {
        id: String,

        /// Enable again on every start
        #[arg(long)]
        auto: bool,
    },

    /// Disable a plugin by registry id
    Disable { id: String },
}

/// Run the plugins command
pub async fn run(command: PluginsCommand) -> anyhow::Result<()> {
    let config = super::bootstrap();
    let settings = super::open_settings(&config);
    let manager = super::start_plugins(&config, settings).await;

    let outcome = match command {
        PluginsCommand::List => {
            for (id, metadata) in manager.available().await {
                let lifecycle = manager.lifecycle(&id).await;
                let marker = if lifecycle == PluginLifecycle::Enabled { "*" } else { " " };
                println!(
                    "{} {:<36} {:<12} {}",
                    marker,
                    id,
                    lifecycle.as_str(),
                    metadata.display_id()
                );
            }
            Ok(())
        }
        PluginsCommand::Enable { id, auto } => {
            if manager.enable(&id, auto).await {
                println!("Enabled {}", id);
                Ok(())
            } else {
                Err(anyhow::anyhow!("Could not enable '{}', see log for details", id))
            }
        }
        PluginsCommand::Disable { id } => {
            if manager.disable(&id).await {
                println!("Disabled {}", id);
                Ok(())
            } else {
                Err(anyhow::anyhow!("Cleanup of '{}' failed, plugin is disabled", id))
            }
        }
    };

    manager.shutdown().await;
    outcome
}
