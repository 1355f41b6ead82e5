//! Exchange data descriptors and the source trait the caches pull from.

use crate::FeedError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

/// Symbol descriptor from the exchange metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SymbolInfo {
    /// Pair identifier (e.g. "BTCUSDT")
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "baseAsset", default)]
    pub base_asset: String,
    #[serde(rename = "quoteAsset", default)]
    pub quote_asset: String,
    /// Trading state (e.g. "TRADING", "BREAK")
    #[serde(default)]
    pub status: String,
}

impl SymbolInfo {
    pub const TRADING: &'static str = "TRADING";

    pub fn new(symbol: &str, base_asset: &str, quote_asset: &str, status: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            base_asset: base_asset.to_string(),
            quote_asset: quote_asset.to_string(),
            status: status.to_string(),
        }
    }

    /// Actively trading pair `base + quote`.
    pub fn trading(base_asset: &str, quote_asset: &str) -> Self {
        let symbol = format!("{}{}", base_asset, quote_asset);
        Self::new(&symbol, base_asset, quote_asset, Self::TRADING)
    }

    pub fn is_trading(&self) -> bool {
        self.status == Self::TRADING
    }
}

/// Latest traded price for one pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TickerPrice {
    #[serde(default)]
    pub symbol: String,
    /// Price as sent by the exchange. Kept as text; entries that do not
    /// parse are skipped when building the cache.
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: String,
}

impl TickerPrice {
    pub fn new(symbol: &str, price: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: price.to_string(),
        }
    }

    /// Parsed price, if it is a finite number.
    pub fn parse_price(&self) -> Option<f64> {
        self.price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

/// Source of exchange metadata and prices.
///
/// Implemented by the REST client in production and by in-memory fakes in
/// tests, so the Symbol Directory and Price Cache never talk to the network
/// directly.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch every symbol descriptor the exchange lists.
    async fn fetch_symbols(&self) -> Result<Vec<SymbolInfo>, FeedError>;

    /// Fetch the latest price of every pair.
    async fn fetch_prices(&self) -> Result<Vec<TickerPrice>, FeedError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_symbol_info_deserialize() {
        let json = r#"{"symbol":"BTCUSDT","status":"TRADING","baseAsset":"BTC","quoteAsset":"USDT","filters":[]}"#;
        let info: SymbolInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info, SymbolInfo::trading("BTC", "USDT"));
        assert!(info.is_trading());
    }

    #[test]
    fn test_symbol_info_missing_fields_default() {
        let info: SymbolInfo = serde_json::from_str(r#"{"symbol":"ODD"}"#).unwrap();
        assert_eq!(info.base_asset, "");
        assert!(!info.is_trading());
    }

    #[test]
    fn test_ticker_price_accepts_string_or_number() {
        let t: TickerPrice = serde_json::from_str(r#"{"symbol":"BTCUSDT","price":"65000.10"}"#).unwrap();
        assert_eq!(t.parse_price(), Some(65000.10));

        let t: TickerPrice = serde_json::from_str(r#"{"symbol":"ETHUSDT","price":2500.5}"#).unwrap();
        assert_eq!(t.parse_price(), Some(2500.5));

        let t: TickerPrice = serde_json::from_str(r#"{"symbol":"XUSDT","price":null}"#).unwrap();
        assert_eq!(t.parse_price(), None);
    }

    #[test]
    fn test_ticker_price_rejects_garbage() {
        assert_eq!(TickerPrice::new("BTCUSDT", "n/a").parse_price(), None);
        assert_eq!(TickerPrice::new("BTCUSDT", "inf").parse_price(), None);
    }
}
