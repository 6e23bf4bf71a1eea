//! Validate configuration command.

use anyhow::Result;
use sentinel_config::{load_config, AppConfig};
use std::path::Path;

use crate::cli::ValidateArgs;

pub async fn run(config_path: Option<&Path>, args: &ValidateArgs) -> Result<()> {
    let config = match config_path {
        Some(path) => {
            println!("Validating configuration: {:?}", path);
            match load_config(path) {
                Ok(config) => config,
                Err(e) => {
                    println!("Configuration error: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => {
            println!("No configuration file given, checking built-in defaults");
            let config = AppConfig::default();
            config.validate()?;
            config
        }
    };

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Instrument: {} ({})", config.trading.symbol, config.trading.timeframe);
    println!("Strategy mode: {:?}", config.trading.strategy_mode);
    println!("Advisory predictions: {}", config.trading.advisory_enabled);
    println!("Stop-loss: {}%", config.risk.stop_loss_pct);
    println!("Take-profit: {}%", config.risk.take_profit_pct);
    println!("Max daily trades: {}", config.risk.max_daily_trades);
    println!("Weekly loss limit: {}%", config.trading.weekly_loss_limit_pct);
    println!("Store: {}", config.store.dir.display());

    if args.print {
        println!();
        println!("{}", config.to_toml()?);
    }

    Ok(())
}
