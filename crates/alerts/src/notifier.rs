//! Notification delivery.

use async_trait::async_trait;
use pricealert_core::{format_price, Alert};
use pricealert_feeds::{send_with_retry, FeedError, RetryPolicy};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Http(#[from] FeedError),
    #[error("Telegram rejected message: {0}")]
    Rejected(String),
}

/// Delivers a text message to a chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError>;
}

/// Message sent when an alert fires.
///
/// `pair` is the exchange pair identifier for the alert's base asset.
pub fn format_trigger_message(alert: &Alert, pair: &str, price: f64) -> String {
    format!(
        "🔔 Alert #{}: <b>{}</b> ({}) is ${} - target {} ({})",
        alert.id,
        escape_html(&alert.symbol.to_uppercase()),
        escape_html(pair),
        format_price(price),
        alert.target,
        alert.direction
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends messages through the Telegram Bot API `sendMessage` method.
///
/// `sendMessage` is not idempotent, so only failures where Telegram cannot
/// have accepted the message (429 and connect errors) are retried.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl TelegramNotifier {
    pub const DEFAULT_API_BASE: &'static str = "https://api.telegram.org";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(token: &str, api_base: &str) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token),
            timeout: Self::DEFAULT_TIMEOUT,
            retry: RetryPolicy::default().non_idempotent(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry.non_idempotent();
        self
    }
}

impl std::fmt::Debug for TelegramNotifier {
    // endpoint embeds the bot token
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        let response = send_with_retry(&self.retry, "sendMessage", || {
            self.client
                .post(&self.endpoint)
                .timeout(self.timeout)
                .json(&body)
        })
        .await?;

        let reply: BotApiResponse = response.json().await.map_err(FeedError::from)?;
        if !reply.ok {
            return Err(NotifyError::Rejected(
                reply.description.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        debug!(chat_id, "Message delivered");
        Ok(())
    }
}
