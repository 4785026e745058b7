mod commands;
mod output;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use fundpilot_lib::{AppConfig, Client, LocalStorage};

use crate::commands::{CliSessionHandler, Context};
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "fundpilot")]
#[command(about = "Track fund valuations and keep a watchlist fresh during market hours")]
struct Cli {
    /// Output format: table, json, csv, markdown
    #[arg(long, default_value = "table", global = true)]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search or look up funds
    Funds(commands::funds::FundsArgs),
    /// Manage the remote watchlist
    Watchlist(commands::watchlist::WatchlistArgs),
    /// Store a session token
    Login(commands::session::LoginArgs),
    /// Forget the stored session token
    Logout,
    /// Check that the backend is reachable
    Health,
    /// Poll the data source and print fresh data on every refresh
    Watch(commands::watch::WatchArgs),
    /// Show or change local preferences
    Settings(commands::settings::SettingsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fundpilot=info".parse()?),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "json" => OutputFormat::Json,
        "csv" => OutputFormat::Csv,
        "markdown" | "md" => OutputFormat::Markdown,
        _ => OutputFormat::Table,
    };

    let config = AppConfig::load();
    config.validate()?;

    let storage = Arc::new(LocalStorage::open(&config.storage_path).with_context(|| {
        format!("opening storage at {}", config.storage_path.display())
    })?);
    let client = Client::new(config.client.clone())?
        .with_token_store(storage.clone())
        .with_session_handler(Arc::new(CliSessionHandler));

    let ctx = Context {
        config,
        storage,
        client: Arc::new(client),
    };

    match &cli.command {
        Commands::Funds(args) => commands::funds::run(args, &ctx, &format).await?,
        Commands::Watchlist(args) => commands::watchlist::run(args, &ctx, &format).await?,
        Commands::Login(args) => commands::session::login(args, &ctx).await?,
        Commands::Logout => commands::session::logout(&ctx)?,
        Commands::Health => commands::health::run(&ctx, &format).await?,
        Commands::Watch(args) => commands::watch::run(args, &ctx, &format).await?,
        Commands::Settings(args) => commands::settings::run(args, &ctx, &format)?,
    }

    Ok(())
}
