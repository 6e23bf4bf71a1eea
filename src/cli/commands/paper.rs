//! Paper trading command implementation.

use anyhow::{Context, Result};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sentinel_broker::PaperExchange;
use sentinel_core::MarketData;
use sentinel_config::AppConfig;
use sentinel_data::{load_csv, JsonlStore, ReplayFeed};
use sentinel_engine::{Pipeline, ProviderChain, TechnicalProxy, Trader};
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::cli::PaperArgs;

pub async fn run(args: PaperArgs, config: AppConfig) -> Result<()> {
    let bars = load_csv(&args.data)
        .with_context(|| format!("Failed to load bars from {}", args.data.display()))?;
    info!(bars = bars.len(), path = %args.data.display(), "Replaying bars as live feed");

    let mut trader_config = config.trader_config();
    if let Some(ms) = args.interval_ms {
        trader_config.cycle_interval = Duration::from_millis(ms.max(1));
    }
    let capital = args.capital.unwrap_or(config.backtest.initial_capital);
    let store_dir = args.store.unwrap_or_else(|| config.store.dir.clone());

    let symbol = config.trading.symbol.clone();
    let feed = Arc::new(ReplayFeed::new(
        symbol.clone(),
        config.trading.timeframe,
        bars,
        config.backtest.warm_up,
    ));
    let exchange = Arc::new(
        PaperExchange::new(capital)
            .with_fee_rate(config.trading.fee_rate)
            .with_slippage(args.slippage),
    );
    let store = Arc::new(
        JsonlStore::open(&store_dir)
            .await
            .with_context(|| format!("Failed to open store at {}", store_dir.display()))?,
    );

    let mut trader = Trader::new(
        trader_config,
        Pipeline::new(config.pipeline_config()),
        feed.clone(),
        exchange.clone(),
        store,
    );
    if config.trading.advisory_enabled && !args.no_advisory {
        let chain = ProviderChain::new(config.prediction_timeout())
            .with_provider(Arc::new(TechnicalProxy::default()));
        trader = trader.with_predictions(chain);
    }
    if args.resume {
        trader.restore().await.context("Failed to restore engine state")?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(forward_shutdown(signal::ctrl_c(), shutdown_tx));

    let state = trader.run(shutdown_rx).await.context("Paper trading failed")?;
    if let Some(price) = feed
        .latest_price(&symbol)
        .await
        .ok()
        .and_then(Decimal::from_f64)
    {
        exchange.mark(price);
    }
    let portfolio = exchange.portfolio_snapshot();

    println!("Paper trading finished");
    println!("Final value: ${:.2}", portfolio.total_value);
    println!("Return: {:.2}%", portfolio.total_return_pct());
    println!("Drawdown from peak: {:.2}%", portfolio.drawdown_pct());
    println!("Cash: ${:.2}", portfolio.cash_balance);
    println!("Asset: {}", portfolio.asset_balance);
    println!("Orders filled: {}", exchange.fills().len());
    println!("Closed trades: {}", state.stats.closed_trades);
    println!("Wins / losses: {} / {}", state.stats.wins, state.stats.losses);
    println!("Realized P&L: ${:.2}", state.stats.realized_pnl);
    println!("Open position: {}", if state.position.is_some() { "yes" } else { "no" });
    println!("Records: {}", store_dir.display());

    Ok(())
}

/// Request shutdown once `signal` fires. If the listener fails the sender is
/// held open, so the trader keeps running until its feed is exhausted.
async fn forward_shutdown<F>(signal: F, shutdown: watch::Sender<bool>)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Shutdown requested");
            let _ = shutdown.send(true);
        }
        Err(e) => {
            warn!(error = %e, "Failed to listen for ctrl-c, running until the feed ends");
            std::future::pending::<()>().await;
        }
    }
}
