//! Core data types for the price alert bot.

pub mod alert;
pub mod error;
pub mod price;
pub mod quote_currency;

pub use alert::*;
pub use error::*;
pub use price::*;
pub use quote_currency::*;
