//! Templates command - lists templates of enabled plugins

/// Run the templates command
pub async fn run() -> anyhow::Result<()> {
    let config = super::bootstrap();
    let settings = super::open_settings(&config);
    let manager = super::start_plugins(&config, settings).await;

    super::shutdown_after(&manager, async {
        let templates = manager.templates().await;
        if templates.is_empty() {
            eprintln!("No templates. Enable a template plugin with `pmp-codegen plugins enable <id>`.");
        }
        for (key, source) in &templates {
            println!("{:<40} {} lines", key, source.lines().count());
        }
        Ok(())
    })
    .await
}
