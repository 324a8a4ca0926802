//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates`, `sendMessage` with inline keyboards
//! for reminders, and `answerCallbackQuery` for button presses.
//! Docs: <https://core.telegram.org/bots/api>

mod polling;
pub(crate) mod send;
pub(crate) mod types;


use hydro_core::{config::TelegramConfig, error::HydroError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    base_url: String,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: TelegramConfig) -> Result<Self, HydroError> {
        if config.bot_token.trim().is_empty() {
            return Err(HydroError::Config("telegram bot_token is empty".into()));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| HydroError::Channel(format!("failed to build http client: {e}")))?;
        let base_url = format!("https://api.telegram.org/bot{}", config.bot_token);
        Ok(Self {
            config,
            client,
            base_url,
            last_update_id: Arc::new(Mutex::new(None)),
        })
    }

    /// Timeout for a single non-polling Bot API call.
    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs.max(1))
    }
}
