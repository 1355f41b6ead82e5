//! Symbol directory.
//!
//! Maps a base-asset ticker ("BTC") to the exchange pair identifier
//! ("BTCUSDT") for every pair actively trading against the reference quote
//! currency. Refreshed wholesale at most once per TTL.

use crate::source::{MarketDataSource, SymbolInfo};
use crate::FeedError;
use pricealert_core::{QuoteCurrency, SymbolMap};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Build the base -> pair mapping from raw exchange symbols.
///
/// Keeps only `TRADING` pairs quoted in `quote`. Keys are uppercased.
pub fn build_symbol_map(symbols: &[SymbolInfo], quote: QuoteCurrency) -> SymbolMap {
    symbols
        .iter()
        .filter(|s| s.is_trading() && s.quote_asset == quote.as_str())
        .filter(|s| !s.base_asset.is_empty() && !s.symbol.is_empty())
        .map(|s| (s.base_asset.to_uppercase(), s.symbol.clone()))
        .collect()
}

#[derive(Debug, Default)]
struct DirectoryState {
    symbols: SymbolMap,
    refreshed_at: Option<Instant>,
}

/// TTL-gated, process-wide symbol directory.
pub struct SymbolDirectory {
    source: Arc<dyn MarketDataSource>,
    quote: QuoteCurrency,
    ttl: Duration,
    state: RwLock<DirectoryState>,
}

impl SymbolDirectory {
    pub fn new(source: Arc<dyn MarketDataSource>, quote: QuoteCurrency, ttl: Duration) -> Self {
        Self {
            source,
            quote,
            ttl,
            state: RwLock::new(DirectoryState::default()),
        }
    }

    pub fn quote(&self) -> QuoteCurrency {
        self.quote
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Non-empty and refreshed within the TTL.
    pub fn is_fresh(&self) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match state.refreshed_at {
            Some(at) => !state.symbols.is_empty() && at.elapsed() < self.ttl,
            None => false,
        }
    }

    /// Refresh the mapping unless it is still fresh.
    ///
    /// Best-effort: a failed fetch keeps the previous mapping and is only
    /// logged.
    pub async fn refresh(&self) {
        if self.is_fresh() {
            return;
        }

        if let Err(e) = self.force_refresh().await {
            warn!(
                error = %e,
                transient = e.is_transient(),
                "Symbol directory refresh failed, keeping previous mapping"
            );
        }
    }

    /// Fetch and swap in a new mapping regardless of age.
    ///
    /// Returns the number of symbols in the new mapping.
    pub async fn force_refresh(&self) -> Result<usize, FeedError> {
        let started = Instant::now();
        let symbols = self.source.fetch_symbols().await?;
        let mapping = build_symbol_map(&symbols, self.quote);
        let count = mapping.len();

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.symbols = mapping;
            state.refreshed_at = Some(started);
        }

        debug!(quote = %self.quote, count, "Symbol directory refreshed");
        Ok(count)
    }

    /// Pair identifier for a base asset, case-insensitive.
    pub fn lookup(&self, base: &str) -> Option<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.symbols.get(&base.to_uppercase()).cloned()
    }

    pub fn contains(&self, base: &str) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.symbols.contains_key(&base.to_uppercase())
    }

    /// Copy of the current mapping.
    pub fn snapshot(&self) -> SymbolMap {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.symbols.clone()
    }

    pub fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SymbolDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolDirectory")
            .field("quote", &self.quote)
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish()
    }
}
