//! Backtest command implementation.

use anyhow::{Context, Result};
use sentinel_backtest::BacktestSimulator;
use sentinel_config::AppConfig;
use sentinel_data::load_csv;
use tracing::info;

use crate::cli::{BacktestArgs, OutputFormat};

pub async fn run(args: BacktestArgs, mut config: AppConfig) -> Result<()> {
    if let Some(capital) = args.capital {
        config.backtest.initial_capital = capital;
    }
    if let Some(warm_up) = args.warm_up {
        config.backtest.warm_up = warm_up;
    }

    if !args.data.exists() {
        anyhow::bail!(
            "Data path '{}' does not exist. Provide a CSV file with --data (e.g. --data ./data/btc_5m.csv)",
            args.data.display()
        );
    }
    let bars = load_csv(&args.data)
        .with_context(|| format!("Failed to load bars from {}", args.data.display()))?;
    info!(bars = bars.len(), path = %args.data.display(), "Loaded historical data");

    let simulator = BacktestSimulator::new(config.backtest_config(), config.pipeline_config())
        .context("Invalid backtest configuration")?;
    let report = simulator.run(&bars).context("Backtest failed")?;

    // Output results
    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    // Save if requested
    if let Some(save_path) = &args.save {
        std::fs::write(save_path, report.to_json()?)
            .with_context(|| format!("Failed to write report to {}", save_path.display()))?;
        info!("Results saved to {:?}", save_path);
    }
    if let Some(csv_path) = &args.equity_csv {
        std::fs::write(csv_path, report.equity_to_csv())
            .with_context(|| format!("Failed to write equity curve to {}", csv_path.display()))?;
        info!("Equity curve saved to {:?}", csv_path);
    }

    Ok(())
}
