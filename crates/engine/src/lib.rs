//! Price alert evaluation engine.
//!
//! This crate contains the periodic loop that checks stored alerts against
//! the latest prices and fires notifications.

pub mod evaluator;

pub use evaluator::*;
