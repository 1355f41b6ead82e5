//! Binance public REST API client.
//!
//! Fetches exchange metadata and the full ticker price list. Every request
//! carries its own timeout and goes through the shared retry policy.

use crate::retry::{send_with_retry, RetryPolicy};
use crate::source::{MarketDataSource, SymbolInfo, TickerPrice};
use crate::FeedError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Per-endpoint request timeouts.
#[derive(Debug, Clone)]
pub struct HttpTimeouts {
    /// `GET /api/v3/exchangeInfo` (large payload, changes rarely)
    pub exchange_info: Duration,
    /// `GET /api/v3/ticker/price`
    pub ticker_prices: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            exchange_info: Duration::from_secs(15),
            ticker_prices: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BinanceExchangeInfo {
    #[serde(default)]
    symbols: Vec<SymbolInfo>,
}

/// Binance REST API client.
#[derive(Debug, Clone)]
pub struct BinanceRestClient {
    client: reqwest::Client,
    base_url: Url,
    timeouts: HttpTimeouts,
    retry: RetryPolicy,
}

impl BinanceRestClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.binance.com";
    const EXCHANGE_INFO_PATH: &'static str = "/api/v3/exchangeInfo";
    const TICKER_PRICE_PATH: &'static str = "/api/v3/ticker/price";

    /// Create a client against `base_url` (scheme and host; any path is replaced).
    pub fn new(base_url: &str) -> Result<Self, FeedError> {
        let base_url = Url::parse(base_url)?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeouts: HttpTimeouts::default(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_timeouts(mut self, timeouts: HttpTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, FeedError> {
        Ok(self.base_url.join(path)?)
    }

    /// Fetch every symbol listed on the exchange.
    pub async fn fetch_exchange_info(&self) -> Result<Vec<SymbolInfo>, FeedError> {
        let url = self.endpoint(Self::EXCHANGE_INFO_PATH)?;
        let timeout = self.timeouts.exchange_info;

        let response = send_with_retry(&self.retry, "exchangeInfo", || {
            self.client.get(url.clone()).timeout(timeout)
        })
        .await?;

        let info: BinanceExchangeInfo = response.json().await?;
        debug!("Binance: fetched {} symbol descriptors", info.symbols.len());
        Ok(info.symbols)
    }

    /// Fetch the latest price of every pair in a single call.
    pub async fn fetch_all_prices(&self) -> Result<Vec<TickerPrice>, FeedError> {
        let url = self.endpoint(Self::TICKER_PRICE_PATH)?;
        let timeout = self.timeouts.ticker_prices;

        let response = send_with_retry(&self.retry, "tickerPrice", || {
            self.client.get(url.clone()).timeout(timeout)
        })
        .await?;

        // Response is array: [{"symbol":"BTCUSDT","price":"65000.00000000"}, ...]
        let tickers: Vec<TickerPrice> = response.json().await?;
        debug!("Binance: fetched {} ticker prices", tickers.len());
        Ok(tickers)
    }
}

#[async_trait]
impl MarketDataSource for BinanceRestClient {
    async fn fetch_symbols(&self) -> Result<Vec<SymbolInfo>, FeedError> {
        self.fetch_exchange_info().await
    }

    async fn fetch_prices(&self) -> Result<Vec<TickerPrice>, FeedError> {
        self.fetch_all_prices().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> BinanceRestClient {
        BinanceRestClient::new(&server.uri())
            .unwrap()
            .with_retry_policy(RetryPolicy::new(1, 5, 3))
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            BinanceRestClient::new("not a url"),
            Err(FeedError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_default_timeouts_differ_per_endpoint() {
        let t = HttpTimeouts::default();
        assert_eq!(t.exchange_info, Duration::from_secs(15));
        assert_eq!(t.ticker_prices, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_fetch_exchange_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/exchangeInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "timezone": "UTC",
                "symbols": [
                    {"symbol": "BTCUSDT", "status": "TRADING", "baseAsset": "BTC", "quoteAsset": "USDT"},
                    {"symbol": "ETHBTC", "status": "TRADING", "baseAsset": "ETH", "quoteAsset": "BTC"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let symbols = client_for(&server).fetch_symbols().await.unwrap();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0], SymbolInfo::trading("BTC", "USDT"));
        assert_eq!(symbols[1].quote_asset, "BTC");
    }

    #[tokio::test]
    async fn test_fetch_prices_retries_on_503() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/ticker/price"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/ticker/price"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"symbol": "BTCUSDT", "price": "65000.00000000"},
                {"symbol": "ETHUSDT", "price": "2500.00000000"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let prices = client_for(&server).fetch_prices().await.unwrap();
        assert_eq!(
            prices,
            vec![
                TickerPrice::new("BTCUSDT", "65000.00000000"),
                TickerPrice::new("ETHUSDT", "2500.00000000"),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/ticker/price"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_prices().await.unwrap_err();
        assert!(matches!(err, FeedError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/exchangeInfo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"symbols": []}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = BinanceRestClient::new(&server.uri())
            .unwrap()
            .with_retry_policy(RetryPolicy::none())
            .with_timeouts(HttpTimeouts {
                exchange_info: Duration::from_millis(50),
                ticker_prices: Duration::from_millis(50),
            });

        let err = client.fetch_symbols().await.unwrap_err();
        assert!(matches!(err, FeedError::Timeout(_)));
    }
}
