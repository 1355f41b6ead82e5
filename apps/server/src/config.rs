//! Application configuration.

use clap::Parser;
use pricealert_core::QuoteCurrency;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Price alert bot CLI. Every option can also be set from the environment
/// (or a `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(name = "pricealert")]
#[command(about = "Telegram price alerts for Binance spot pairs", long_about = None)]
pub struct Args {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: String,

    /// Binance REST API base URL
    #[arg(long, env = "BINANCE_API_BASE", default_value = "https://api.binance.com")]
    pub binance_api_base: String,

    /// Telegram Bot API base URL
    #[arg(long, env = "TELEGRAM_API_BASE", default_value = "https://api.telegram.org")]
    pub telegram_api_base: String,

    /// Quote currency prices are taken in: USDT, USDC, FDUSD, BUSD
    #[arg(long, env = "QUOTE_ASSET", default_value = "USDT")]
    pub quote_asset: String,

    /// Price refresh interval, also the alert check interval (seconds)
    #[arg(long, env = "PRICE_REFRESH_SECONDS", default_value_t = 5)]
    pub price_refresh_seconds: u64,

    /// Symbol list refresh interval (seconds)
    #[arg(long, env = "SYMBOL_REFRESH_SECONDS", default_value_t = 300)]
    pub symbol_refresh_seconds: u64,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "data.db")]
    pub database_path: PathBuf,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("TELEGRAM_TOKEN must not be empty")]
    MissingToken,
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
    #[error("Unsupported quote asset: {0}")]
    UnsupportedQuote(String),
    #[error("Unknown log level: {0}")]
    InvalidLogLevel(String),
}

/// Validated application configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub telegram_token: String,
    pub binance_api_base: String,
    pub telegram_api_base: String,
    pub quote: QuoteCurrency,
    /// Price cache max age and evaluator tick interval.
    pub price_refresh: Duration,
    /// Symbol directory TTL.
    pub symbol_ttl: Duration,
    pub database_path: PathBuf,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let telegram_token = args.telegram_token.trim().to_string();
        if telegram_token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if args.price_refresh_seconds == 0 {
            return Err(ConfigError::ZeroInterval("PRICE_REFRESH_SECONDS"));
        }
        if args.symbol_refresh_seconds == 0 {
            return Err(ConfigError::ZeroInterval("SYMBOL_REFRESH_SECONDS"));
        }

        let quote = QuoteCurrency::from_str(&args.quote_asset)
            .ok_or_else(|| ConfigError::UnsupportedQuote(args.quote_asset.clone()))?;

        let log_level = args.log_level.trim().to_lowercase();
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(args.log_level));
        }

        Ok(Self {
            telegram_token,
            binance_api_base: args.binance_api_base,
            telegram_api_base: args.telegram_api_base,
            quote,
            price_refresh: Duration::from_secs(args.price_refresh_seconds),
            symbol_ttl: Duration::from_secs(args.symbol_refresh_seconds),
            database_path: args.database_path,
            log_level,
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("telegram_token", &"<redacted>")
            .field("binance_api_base", &self.binance_api_base)
            .field("telegram_api_base", &self.telegram_api_base)
            .field("quote", &self.quote)
            .field("price_refresh", &self.price_refresh)
            .field("symbol_ttl", &self.symbol_ttl)
            .field("database_path", &self.database_path)
            .field("log_level", &self.log_level)
            .finish()
    }
}
