//! Reference quote currency that all prices are denominated in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable quote currency used to pick pairs off the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum QuoteCurrency {
    /// Tether (most common stablecoin)
    #[default]
    USDT,
    /// USD Coin
    USDC,
    /// First Digital USD
    FDUSD,
    /// Binance USD (legacy)
    BUSD,
}

impl QuoteCurrency {
    /// Parse from string, case-insensitive.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "USDT" => Some(QuoteCurrency::USDT),
            "USDC" => Some(QuoteCurrency::USDC),
            "FDUSD" => Some(QuoteCurrency::FDUSD),
            "BUSD" => Some(QuoteCurrency::BUSD),
            _ => None,
        }
    }

    /// Ticker as used in exchange pair identifiers.
    pub fn as_str(self) -> &'static str {
        match self {
            QuoteCurrency::USDT => "USDT",
            QuoteCurrency::USDC => "USDC",
            QuoteCurrency::FDUSD => "FDUSD",
            QuoteCurrency::BUSD => "BUSD",
        }
    }

    /// Build the pair identifier for a base asset (e.g. "BTC" -> "BTCUSDT").
    pub fn pair_for(self, base: &str) -> String {
        format!("{}{}", base.to_uppercase(), self.as_str())
    }

    /// Extract the base asset from a pair identifier quoted in this currency.
    ///
    /// Returns `None` when the pair is quoted in something else or the base
    /// would be empty.
    pub fn base_of(self, pair: &str) -> Option<&str> {
        pair.strip_suffix(self.as_str()).filter(|base| !base.is_empty())
    }
}

impl fmt::Display for QuoteCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(QuoteCurrency::from_str("USDT"), Some(QuoteCurrency::USDT));
        assert_eq!(QuoteCurrency::from_str("usdc"), Some(QuoteCurrency::USDC));
        assert_eq!(QuoteCurrency::from_str(" fdusd "), Some(QuoteCurrency::FDUSD));
        assert_eq!(QuoteCurrency::from_str("KRW"), None);
    }

    #[test]
    fn test_default_is_usdt() {
        assert_eq!(QuoteCurrency::default(), QuoteCurrency::USDT);
    }

    #[test]
    fn test_pair_for() {
        assert_eq!(QuoteCurrency::USDT.pair_for("btc"), "BTCUSDT");
        assert_eq!(QuoteCurrency::USDC.pair_for("ETH"), "ETHUSDC");
    }

    #[test]
    fn test_base_of() {
        assert_eq!(QuoteCurrency::USDT.base_of("BTCUSDT"), Some("BTC"));
        assert_eq!(QuoteCurrency::USDT.base_of("ETHBTC"), None);
        assert_eq!(QuoteCurrency::USDT.base_of("USDT"), None);
        // FDUSD pairs also end in "USD" but not "USDT"
        assert_eq!(QuoteCurrency::USDT.base_of("BTCFDUSD"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", QuoteCurrency::USDT), "USDT");
        assert_eq!(format!("{}", QuoteCurrency::BUSD), "BUSD");
    }
}
