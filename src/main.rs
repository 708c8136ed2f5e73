use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod db;
mod input;
mod output;

use commands::{AddCommand, ConfigCommand, DeleteCommand, GetCommand, UpdateCommand};
use config::Config;
use db::{init_db, SqliteStore};
use output::{Show, TerminalOutput};

#[derive(Parser)]
#[command(name = "datum")]
#[command(version)]
#[command(about = "A personal data log with content-derived ids", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// How much to print per operation (overrides config)
    #[arg(long, global = true, value_enum)]
    show: Option<Show>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new datum
    Add(AddCommand),

    /// Show a document by quick id
    Get(GetCommand),

    /// Merge new data into a document
    Update(UpdateCommand),

    /// Delete a document
    Delete(DeleteCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn open_store(config: &Config) -> Result<SqliteStore, sqlx::Error> {
    let pool = init_db(&config.database_path.value).await?;
    Ok(SqliteStore::new(pool))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;
    let output = TerminalOutput::new(cli.show.unwrap_or(config.show.value));

    match cli.command {
        Some(Commands::Add(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(&store, &output).await?;
        }
        Some(Commands::Get(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(&store, &output).await?;
        }
        Some(Commands::Update(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(&store, &output).await?;
        }
        Some(Commands::Delete(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(&store, &output).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
