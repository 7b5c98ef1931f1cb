//! Sophia CLI entry point.

use anyhow::Result;
use clap::Parser;
use sophia::cli::{commands, Cli, Commands};
use sophia::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("sophia={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Load configuration
    let config_path = cli.config.as_deref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Execute command
    match &cli.command {
        Commands::Process(args) => {
            std::fs::create_dir_all(settings.data_dir())?;
            std::fs::create_dir_all(settings.temp_dir())?;
            commands::run_process(args, settings).await?;
        }

        Commands::Usage {
            action,
            all,
            month,
            list,
        } => {
            std::fs::create_dir_all(settings.data_dir())?;
            commands::run_usage(action.as_ref(), *all, month.as_deref(), *list, &settings)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &settings, config_path.as_ref())?;
        }
    }

    Ok(())
}
