//! Configuration management.

mod settings;

pub use settings::{
    AppConfig, AppSettings, BacktestSettings, LoggingConfig, StoreSettings, TradingSettings,
};

use config::{Config, Environment, File};
use sentinel_core::TradingError;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] TradingError),
}

/// Load configuration from file and environment, then validate it.
///
/// Environment variables override file values as
/// `SENTINEL__<SECTION>__<KEY>`, e.g. `SENTINEL__TRADING__SYMBOL`.
pub fn load_config(path: &Path) -> Result<AppConfig, SettingsError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("SENTINEL")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app: AppConfig = config.try_deserialize()?;
    app.validate()?;
    Ok(app)
}
