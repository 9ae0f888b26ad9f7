use clap::Parser;
use pmp_codegen::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => cli::generate::run(args).await,
        Command::Models(args) => cli::models::run(args).await,
        Command::Plugins(command) => cli::plugins::run(command).await,
        Command::Templates => cli::templates::run().await,
    }
}
