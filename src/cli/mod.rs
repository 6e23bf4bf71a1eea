//! CLI definitions.

pub mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use sentinel_config::{load_config, AppConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(author, version, about = "Single-instrument signal, risk and decision engine")]
pub struct Cli {
    /// Configuration file path; built-in defaults when omitted
    #[arg(short, long, env = "SENTINEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level, overrides the configured one
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Configuration from `--config`, or defaults.
    pub fn load_config(&self) -> Result<AppConfig> {
        match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display())),
            None => Ok(AppConfig::default()),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay historical bars through the decision pipeline
    Backtest(BacktestArgs),
    /// Paper trade against a replayed bar feed
    Paper(PaperArgs),
    /// Validate configuration
    ValidateConfig(ValidateArgs),
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Data file (CSV: timestamp,open,high,low,close,volume)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Initial capital, overrides the configured one
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Bars consumed before the first decision
    #[arg(long)]
    pub warm_up: Option<usize>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub output: OutputFormat,

    /// Save the JSON report to file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Save the equity curve as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct PaperArgs {
    /// Data file replayed as the live feed
    #[arg(short, long)]
    pub data: PathBuf,

    /// Initial capital, overrides the configured one
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Milliseconds between cycles, overrides the configured interval
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Store directory, overrides the configured one
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Adverse fill slippage in percent of price
    #[arg(long, default_value = "0")]
    pub slippage: Decimal,

    /// Resume from the saved engine snapshot
    #[arg(long)]
    pub resume: bool,

    /// Act on technical signals alone
    #[arg(long)]
    pub no_advisory: bool,
}

#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Print the effective configuration as TOML
    #[arg(long)]
    pub print: bool,
}
