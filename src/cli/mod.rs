pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "devcamper")]
#[command(about = "DevCamper CLI - database seeding and maintenance")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Import or destroy sample data")]
    Seed {
        #[command(subcommand)]
        cmd: commands::seed::SeedCommands,
    },

    #[command(about = "Apply pending database migrations")]
    Migrate,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Seed { cmd } => commands::seed::handle(cmd).await,
        Commands::Migrate => commands::migrate::handle().await,
    }
}
