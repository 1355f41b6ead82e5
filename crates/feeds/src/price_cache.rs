//! Latest-price cache keyed by base asset.

use crate::source::{MarketDataSource, TickerPrice};
use crate::FeedError;
use pricealert_core::{PriceMap, QuoteCurrency};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Build the base -> price mapping from the full ticker list.
///
/// Pairs not quoted in `quote` are dropped, as are entries whose price does
/// not parse.
pub fn build_price_map(tickers: &[TickerPrice], quote: QuoteCurrency) -> PriceMap {
    let mut prices = PriceMap::with_capacity(tickers.len() / 4);
    for ticker in tickers {
        let Some(base) = quote.base_of(&ticker.symbol) else {
            continue;
        };
        let Some(price) = ticker.parse_price() else {
            continue;
        };
        prices.insert(base.to_uppercase(), price);
    }
    prices
}

#[derive(Debug, Default)]
struct CacheState {
    prices: PriceMap,
    refreshed_at: Option<Instant>,
}

/// Wholesale-refreshed price cache with a lazy refresh on stale reads.
pub struct PriceCache {
    source: Arc<dyn MarketDataSource>,
    quote: QuoteCurrency,
    max_age: Duration,
    state: RwLock<CacheState>,
}

impl PriceCache {
    /// `max_age` is the price refresh interval; reads older than that go
    /// back to the exchange first.
    pub fn new(source: Arc<dyn MarketDataSource>, quote: QuoteCurrency, max_age: Duration) -> Self {
        Self {
            source,
            quote,
            max_age,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn quote(&self) -> QuoteCurrency {
        self.quote
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Refresh unconditionally, logging and swallowing failures.
    pub async fn refresh(&self) {
        if let Err(e) = self.try_refresh().await {
            warn!(
                error = %e,
                transient = e.is_transient(),
                "Price refresh failed, keeping previous prices"
            );
        }
    }

    /// Fetch every ticker and swap in the new mapping.
    ///
    /// On error the previous mapping and timestamp are left untouched.
    pub async fn try_refresh(&self) -> Result<usize, FeedError> {
        let tickers = self.source.fetch_prices().await?;
        let prices = build_price_map(&tickers, self.quote);
        let count = prices.len();

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.prices = prices;
            state.refreshed_at = Some(Instant::now());
        }

        debug!(quote = %self.quote, count, "Prices refreshed");
        Ok(count)
    }

    /// Non-empty and no older than `max_age`.
    pub fn is_fresh(&self) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match state.refreshed_at {
            Some(at) => !state.prices.is_empty() && at.elapsed() <= self.max_age,
            None => false,
        }
    }

    /// Latest price for `base`, case-insensitive.
    ///
    /// A stale or empty cache is refreshed first, so this may block on the
    /// ticker request (bounded by its timeout).
    pub async fn get(&self, base: &str) -> Option<f64> {
        if !self.is_fresh() {
            self.refresh().await;
        }
        self.cached(base)
    }

    /// Cached price without any refresh.
    pub fn cached(&self, base: &str) -> Option<f64> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.prices.get(&base.to_uppercase()).copied()
    }

    /// Consistent copy of the whole mapping.
    pub fn snapshot(&self) -> PriceMap {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.prices.clone()
    }

    pub fn refreshed_at(&self) -> Option<Instant> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.refreshed_at
    }

    pub fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for PriceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceCache")
            .field("quote", &self.quote)
            .field("max_age", &self.max_age)
            .field("len", &self.len())
            .finish()
    }
}
