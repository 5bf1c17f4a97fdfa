use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tapedeck::config::Config;

#[derive(Parser)]
#[command(
    name = "tapedeck",
    version,
    about = "Community mixtape bot engine: rolling playlists of chat-submitted video links",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file (env vars are used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use the development profile (shrunken intervals)
    #[arg(long, global = true)]
    dev: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the playlist engine and its scheduler until interrupted
    Run,

    /// Show the open playlist and item counts
    Status,

    /// Force one release evaluation pass
    Release,

    /// Force one retention cleanup pass
    Cleanup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Run => {
            tracing::info!(
                release_interval_hours = config.engine.release_interval_hours,
                release_threshold = config.engine.release_threshold_item_count,
                "starting tapedeck"
            );
            tapedeck::commands::run(config).await?;
        }

        Commands::Status => {
            tapedeck::commands::status(config).await?;
        }

        Commands::Release => {
            tracing::info!("forcing a release evaluation pass");
            tapedeck::commands::release(config).await?;
        }

        Commands::Cleanup => {
            tracing::info!("forcing a retention cleanup pass");
            tapedeck::commands::cleanup(config).await?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = if cli.dev {
        Config::development()
    } else if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::from_env()?
    };

    config.validate()?;
    Ok(config)
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("tapedeck=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("tapedeck=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}
