//! Price alerts: storage, delivery and the Telegram front end.
//!
//! This crate provides:
//! - SQLite-based alert storage
//! - Notification delivery through the Telegram Bot API
//! - Chat command handling

pub mod commands;
pub mod db;
pub mod notifier;
pub mod telegram;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use commands::CommandService;
pub use db::{AlertStore, StoreError};
pub use notifier::{format_trigger_message, Notifier, NotifyError, TelegramNotifier};
pub use telegram::TelegramBot;
