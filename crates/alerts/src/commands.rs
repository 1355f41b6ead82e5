//! Chat command logic, independent of the chat transport.

use crate::db::{AlertStore, StoreError};
use pricealert_core::{format_price, parse_target, AlertId, Direction, ValidationError};
use pricealert_feeds::{PriceCache, SymbolDirectory};
use std::sync::Arc;
use tracing::{debug, error};

pub const HELP_TEXT: &str = "/price <symbol> - get USD price for a base coin, e.g. /price BTC\n\
/alert <symbol> <target> - set alert; prefix '<' for below, e.g. /alert BTC <30000\n\
/alerts - list alerts in this chat\n\
/removealert <id> - remove your alert\n\
/help - this help";

pub const WELCOME_TEXT: &str = "Price alert bot. I watch Binance prices and message you when a target is crossed.";

const PRICE_USAGE: &str = "Usage: /price <symbol>";
const ALERT_USAGE: &str = "Usage: /alert <symbol> <target>";
const REMOVE_USAGE: &str = "Usage: /removealert <id>";
const STORAGE_FAILURE: &str = "Something went wrong, please try again later";

/// Turns command arguments into store and cache operations and reply text.
pub struct CommandService {
    store: Arc<AlertStore>,
    directory: Arc<SymbolDirectory>,
    prices: Arc<PriceCache>,
}

impl CommandService {
    pub fn new(
        store: Arc<AlertStore>,
        directory: Arc<SymbolDirectory>,
        prices: Arc<PriceCache>,
    ) -> Self {
        Self {
            store,
            directory,
            prices,
        }
    }

    /// `/price <symbol>`
    pub async fn price(&self, args: &str) -> String {
        let symbol = match first_arg(args, "symbol") {
            Ok(symbol) => symbol,
            Err(e) => return rejection("price", &e),
        };

        self.directory.refresh().await;
        match self.prices.get(symbol).await {
            Some(price) => format!("{} = ${}", symbol.to_uppercase(), format_price(price)),
            None => "Price not available".to_string(),
        }
    }

    /// `/alert <symbol> <target>`
    pub async fn alert(&self, chat_id: i64, user_id: i64, args: &str) -> String {
        let request = match self.parse_alert(args).await {
            Ok(request) => request,
            Err(e) => {
                debug!(chat_id, error = %e, "Rejected alert");
                return rejection("alert", &e);
            }
        };

        match self
            .store
            .add(
                chat_id,
                user_id,
                &request.symbol,
                &request.base_asset,
                request.target,
                request.direction,
            )
            .await
        {
            Ok(id) => format!(
                "Alert #{} set: {} {} {}",
                id,
                request.symbol.to_uppercase(),
                request.direction.sign(),
                request.target
            ),
            Err(e) => storage_failure("alert", chat_id, e),
        }
    }

    async fn parse_alert(&self, args: &str) -> Result<AlertRequest, ValidationError> {
        let mut parts = args.split_whitespace();
        let symbol = parts.next().ok_or(ValidationError::MissingArgument("symbol"))?;
        let raw_target = parts.next().ok_or(ValidationError::MissingArgument("target"))?;
        let (target, direction) = parse_target(raw_target)?;

        self.directory.refresh().await;
        let base_asset = symbol.to_uppercase();
        if !self.directory.contains(&base_asset) {
            return Err(ValidationError::UnknownSymbol(symbol.to_string()));
        }

        Ok(AlertRequest {
            symbol: symbol.to_string(),
            base_asset,
            target,
            direction,
        })
    }

    /// `/alerts`
    pub async fn alerts(&self, chat_id: i64) -> String {
        let alerts = match self.store.list_for_chat(chat_id).await {
            Ok(alerts) => alerts,
            Err(e) => return storage_failure("alerts", chat_id, e),
        };

        if alerts.is_empty() {
            return "No active alerts".to_string();
        }

        alerts
            .iter()
            .map(|a| {
                format!(
                    "#{} {} ({}) {} {}",
                    a.id,
                    a.symbol.to_uppercase(),
                    a.base_asset,
                    a.direction.sign(),
                    a.target
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `/removealert <id>`
    pub async fn remove_alert(&self, chat_id: i64, user_id: i64, args: &str) -> String {
        let id = match first_arg(args, "id").and_then(|raw| raw.parse::<AlertId>()) {
            Ok(id) => id,
            Err(e) => return rejection("removealert", &e),
        };

        match self.store.remove(id, user_id).await {
            Ok(true) => format!("Removed alert #{}", id),
            Ok(false) => "Alert not found or you are not the owner".to_string(),
            Err(e) => storage_failure("removealert", chat_id, e),
        }
    }
}

struct AlertRequest {
    symbol: String,
    base_asset: String,
    target: f64,
    direction: Direction,
}

fn first_arg<'a>(args: &'a str, name: &'static str) -> Result<&'a str, ValidationError> {
    args.split_whitespace()
        .next()
        .ok_or(ValidationError::MissingArgument(name))
}

/// Reply text for rejected input.
fn rejection(command: &str, e: &ValidationError) -> String {
    match e {
        ValidationError::MissingArgument(_) => match command {
            "price" => PRICE_USAGE,
            "alert" => ALERT_USAGE,
            _ => REMOVE_USAGE,
        }
        .to_string(),
        ValidationError::InvalidTarget(_) => "Invalid target".to_string(),
        ValidationError::UnknownSymbol(_) => "Unknown or unsupported symbol on Binance".to_string(),
        ValidationError::InvalidAlertId(_) => "Invalid ID".to_string(),
    }
}

fn storage_failure(command: &str, chat_id: i64, e: StoreError) -> String {
    error!(command, chat_id, error = %e, "Command failed");
    STORAGE_FAILURE.to_string()
}
