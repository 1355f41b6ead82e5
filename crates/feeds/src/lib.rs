//! Exchange market data for the price alert bot.
//!
//! This crate fetches symbol metadata and ticker prices from the Binance
//! public REST API and keeps them in two process-wide caches.
//!
//! ## Architecture
//!
//! - `rest` - Binance REST client (per-endpoint timeouts, transport retry)
//! - `source` - `MarketDataSource` trait the caches pull from
//! - `discovery` - `SymbolDirectory`, base asset -> pair, TTL-gated
//! - `price_cache` - `PriceCache`, base asset -> latest price, lazy refresh

pub mod discovery;
pub mod error;
pub mod price_cache;
pub mod rest;
pub mod retry;
pub mod source;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use discovery::*;
pub use error::*;
pub use price_cache::*;
pub use rest::*;
pub use retry::*;
pub use source::*;
