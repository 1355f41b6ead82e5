//! Price Alert Bot - Headless Server
//!
//! Polls Binance prices, evaluates user alerts and answers Telegram commands.

mod config;

use anyhow::Context;
use clap::Parser;
use config::{AppConfig, Args};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pricealert_alerts::{AlertStore, CommandService, TelegramBot, TelegramNotifier};
use pricealert_engine::{AlertEvaluator, EvaluatorConfig};
use pricealert_feeds::{
    BinanceRestClient, HttpTimeouts, MarketDataSource, PriceCache, RetryPolicy, SymbolDirectory,
};

/// `RUST_LOG` wins over `--log-level` when set.
fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let config = AppConfig::from_args(args).context("Invalid configuration")?;

    init_logging(&config.log_level)?;

    info!("🚀 Price alert bot starting...");
    info!("  Quote asset: {}", config.quote);
    info!("  Price refresh: {:?}", config.price_refresh);
    info!("  Symbol refresh: {:?}", config.symbol_ttl);
    info!("  Database: {}", config.database_path.display());

    let store = Arc::new(
        AlertStore::connect(&config.database_path)
            .await
            .context("Failed to open alert store")?,
    );

    let binance: Arc<dyn MarketDataSource> = Arc::new(
        BinanceRestClient::new(&config.binance_api_base)?
            .with_timeouts(HttpTimeouts::default())
            .with_retry_policy(RetryPolicy::default().with_jitter()),
    );
    let directory = Arc::new(SymbolDirectory::new(
        binance.clone(),
        config.quote,
        config.symbol_ttl,
    ));
    let prices = Arc::new(PriceCache::new(binance, config.quote, config.price_refresh));

    directory.refresh().await;
    info!("  Symbols: {} {} pairs trading", directory.len(), config.quote);

    let notifier = Arc::new(
        TelegramNotifier::new(&config.telegram_token, &config.telegram_api_base)?
            .with_retry_policy(RetryPolicy::default().with_jitter()),
    );

    let evaluator = Arc::new(AlertEvaluator::new(
        directory.clone(),
        prices.clone(),
        store.clone(),
        notifier,
        EvaluatorConfig {
            interval: config.price_refresh,
        },
    ));
    let evaluator_handle = evaluator.spawn();

    let bot = Arc::new(
        TelegramBot::new(
            &config.telegram_token,
            CommandService::new(store.clone(), directory, prices),
        )
        .with_api_url(&config.telegram_api_base)?,
    );

    // Returns on Ctrl-C
    bot.run().await;

    info!("Shutting down...");
    evaluator_handle.abort();
    store.close().await;

    Ok(())
}
