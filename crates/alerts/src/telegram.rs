//! Telegram bot handlers.

use crate::commands::{CommandService, HELP_TEXT, WELCOME_TEXT};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
    #[error("Invalid Bot API URL: {0}")]
    InvalidUrl(String),
}

/// Bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Show help")]
    Help,
    #[command(description = "Current price. Usage: /price BTC")]
    Price(String),
    #[command(description = "Set an alert. Usage: /alert BTC 70000 or /alert BTC <60000")]
    Alert(String),
    #[command(description = "List alerts in this chat")]
    Alerts,
    #[command(description = "Remove your alert. Usage: /removealert 12")]
    Removealert(String),
}

/// Telegram bot wrapper.
pub struct TelegramBot {
    bot: Bot,
    commands: CommandService,
}

impl TelegramBot {
    pub fn new(token: &str, commands: CommandService) -> Self {
        Self {
            bot: Bot::new(token),
            commands,
        }
    }

    /// Point the bot at a different Bot API server.
    pub fn with_api_url(mut self, api_base: &str) -> Result<Self, TelegramError> {
        let url = reqwest::Url::parse(api_base)
            .map_err(|e| TelegramError::InvalidUrl(format!("{}: {}", api_base, e)))?;
        self.bot = self.bot.set_api_url(url);
        Ok(self)
    }

    /// Run the command dispatcher until Ctrl-C.
    pub async fn run(self: Arc<Self>) {
        let bot = self.bot.clone();
        let handler = Update::filter_message().filter_command::<Command>().endpoint(
            move |bot: Bot, msg: Message, cmd: Command| {
                let this = Arc::clone(&self);
                async move { this.handle_command(bot, msg, cmd).await }
            },
        );

        info!("Telegram command dispatcher started");
        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    async fn handle_command(
        &self,
        bot: Bot,
        msg: Message,
        cmd: Command,
    ) -> Result<(), TelegramError> {
        let chat_id = msg.chat.id.0;
        // Channel posts carry no sender; the channel itself owns those alerts
        let user_id = msg
            .from
            .as_ref()
            .map(|user| user.id.0 as i64)
            .unwrap_or(chat_id);

        let reply = match cmd {
            Command::Start => format!("{}\n\n{}", WELCOME_TEXT, HELP_TEXT),
            Command::Help => HELP_TEXT.to_string(),
            Command::Price(args) => self.commands.price(&args).await,
            Command::Alert(args) => self.commands.alert(chat_id, user_id, &args).await,
            Command::Alerts => self.commands.alerts(chat_id).await,
            Command::Removealert(args) => {
                self.commands.remove_alert(chat_id, user_id, &args).await
            }
        };

        bot.send_message(msg.chat.id, reply).await?;
        Ok(())
    }
}
