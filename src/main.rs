//! Sentinel CLI application.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use sentinel_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::ValidateConfig(args) = &cli.command {
        return cli::commands::validate::run(cli.config.as_deref(), args).await;
    }

    let config = cli.load_config()?;

    // Setup logging
    let level = cli
        .log_level
        .map(|l| l.as_str())
        .unwrap_or(config.logging.level.as_str());
    let _guard = setup_logging(
        level,
        cli.json_logs || config.logging.is_json(),
        config.logging.file.as_deref(),
    );

    // Execute command
    match cli.command {
        Commands::Backtest(args) => cli::commands::backtest::run(args, config).await,
        Commands::Paper(args) => cli::commands::paper::run(args, config).await,
        Commands::ValidateConfig(_) => Ok(()),
    }
}
