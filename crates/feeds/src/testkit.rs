//! In-memory market data source for tests.

use crate::source::{MarketDataSource, SymbolInfo, TickerPrice};
use crate::FeedError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Scriptable [`MarketDataSource`] that counts fetches.
#[derive(Debug, Default)]
pub struct StaticMarketSource {
    symbols: Mutex<Vec<SymbolInfo>>,
    prices: Mutex<Vec<TickerPrice>>,
    failing: AtomicBool,
    symbol_fetches: AtomicUsize,
    price_fetches: AtomicUsize,
}

impl StaticMarketSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// List a trading pair without a price.
    pub fn with_pair(self, base: &str, quote: &str) -> Self {
        self.lock_symbols().push(SymbolInfo::trading(base, quote));
        self
    }

    /// List a trading pair and quote it at `price`.
    pub fn with_price(self, base: &str, quote: &str, price: f64) -> Self {
        let pair = format!("{}{}", base, quote);
        self.lock_symbols().push(SymbolInfo::trading(base, quote));
        self.lock_prices()
            .push(TickerPrice::new(&pair, &price.to_string()));
        self
    }

    /// Set (or add) the price for a pair.
    pub fn set_price(&self, pair: &str, price: f64) {
        let mut prices = self.lock_prices();
        match prices.iter_mut().find(|t| t.symbol == pair) {
            Some(ticker) => ticker.price = price.to_string(),
            None => prices.push(TickerPrice::new(pair, &price.to_string())),
        }
    }

    /// Drop a pair from both the symbol list and the ticker list.
    pub fn delist(&self, pair: &str) {
        self.lock_symbols().retain(|s| s.symbol != pair);
        self.lock_prices().retain(|t| t.symbol != pair);
    }

    /// Make every fetch fail with a connection error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn symbol_fetches(&self) -> usize {
        self.symbol_fetches.load(Ordering::SeqCst)
    }

    pub fn price_fetches(&self) -> usize {
        self.price_fetches.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<(), FeedError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(FeedError::ConnectionFailed("source unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    fn lock_symbols(&self) -> std::sync::MutexGuard<'_, Vec<SymbolInfo>> {
        self.symbols.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_prices(&self) -> std::sync::MutexGuard<'_, Vec<TickerPrice>> {
        self.prices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MarketDataSource for StaticMarketSource {
    async fn fetch_symbols(&self) -> Result<Vec<SymbolInfo>, FeedError> {
        self.symbol_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self.lock_symbols().clone())
    }

    async fn fetch_prices(&self) -> Result<Vec<TickerPrice>, FeedError> {
        self.price_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self.lock_prices().clone())
    }
}
