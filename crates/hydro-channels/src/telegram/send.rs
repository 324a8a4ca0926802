//! Message sending: text with inline keyboards, callback acks, and command registration.

use super::TelegramChannel;
use crate::utils::split_message;
use hydro_core::{error::HydroError, message::Controls};
use serde_json::Value;
use tracing::{info, warn};

/// Telegram's hard limit for one message.
const MAX_MESSAGE_LEN: usize = 4096;

/// Commands advertised in the client's autocomplete menu.
pub(crate) const BOT_COMMANDS: &[(&str, &str)] = &[
    ("start", "Register and schedule today's reminders"),
    ("drink", "Log a glass of water (optional ml)"),
    ("stats", "Today's progress"),
    ("week", "Last 7 days"),
    ("achievements", "Streak and badges"),
    ("history", "Recent intake"),
    ("goal", "Show or set your daily goal"),
    ("hours", "Show or set your reminder hours"),
    ("notify", "Turn reminders on or off"),
    ("schedule", "Today's reminder times"),
    ("motivate", "A bit of motivation"),
    ("fact", "A hydration fact"),
    ("delete", "Delete your account and data"),
    ("help", "Show available commands"),
];

/// Render controls as a Bot API `reply_markup` object.
pub(crate) fn inline_keyboard(controls: &Controls) -> Value {
    let rows: Vec<Vec<Value>> = controls
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| serde_json::json!({ "text": b.label, "callback_data": b.data }))
                .collect()
        })
        .collect();
    serde_json::json!({ "inline_keyboard": rows })
}

/// Build a `sendMessage` body. Only the last chunk carries the keyboard.
pub(crate) fn message_body(
    chat_id: i64,
    text: &str,
    controls: Option<&Controls>,
    markdown: bool,
) -> Value {
    let mut body = serde_json::json!({
        "chat_id": chat_id,
        "text": text,
    });
    if markdown {
        body["parse_mode"] = Value::from("Markdown");
    }
    if let Some(c) = controls.filter(|c| !c.rows.is_empty()) {
        body["reply_markup"] = inline_keyboard(c);
    }
    body
}

impl TelegramChannel {
    /// Send a text message to a specific chat, with optional buttons under the last chunk.
    pub(crate) async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        controls: Option<&Controls>,
    ) -> Result<(), HydroError> {
        let chunks = split_message(text, MAX_MESSAGE_LEN);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.into_iter().enumerate() {
            let keyboard = if i == last { controls } else { None };
            let url = format!("{}/sendMessage", self.base_url);
            let body = message_body(chat_id, chunk, keyboard, true);

            let resp = self
                .client
                .post(&url)
                .timeout(self.request_timeout())
                .json(&body)
                .send()
                .await
                .map_err(|e| HydroError::Channel(format!("telegram send failed: {e}")))?;

            let status = resp.status();
            if status.is_success() {
                continue;
            }

            let error_text = resp.text().await.unwrap_or_default();
            if !error_text.contains("can't parse entities") {
                return Err(HydroError::Channel(format!(
                    "telegram send failed ({status}): {error_text}"
                )));
            }

            warn!("Markdown parse failed, retrying as plain text: {error_text}");
            let plain_resp = self
                .client
                .post(&url)
                .timeout(self.request_timeout())
                .json(&message_body(chat_id, chunk, keyboard, false))
                .send()
                .await
                .map_err(|e| HydroError::Channel(format!("telegram send (plain) failed: {e}")))?;
            if !plain_resp.status().is_success() {
                let plain_err = plain_resp.text().await.unwrap_or_default();
                return Err(HydroError::Channel(format!(
                    "telegram send (plain fallback) failed: {plain_err}"
                )));
            }
        }

        Ok(())
    }

    /// Acknowledge a button press.
    pub(crate) async fn answer_callback_query(&self, callback_id: &str) -> Result<(), HydroError> {
        let url = format!("{}/answerCallbackQuery", self.base_url);
        let body = serde_json::json!({ "callback_query_id": callback_id });

        let resp = self
            .client
            .post(&url)
            .timeout(self.request_timeout())
            .json(&body)
            .send()
            .await
            .map_err(|e| HydroError::Channel(format!("telegram answerCallbackQuery failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(HydroError::Channel(format!(
                "telegram answerCallbackQuery failed ({status}): {error_text}"
            )));
        }
        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands: Vec<Value> = BOT_COMMANDS
            .iter()
            .map(|(command, description)| {
                serde_json::json!({ "command": command, "description": description })
            })
            .collect();
        let body = serde_json::json!({ "commands": commands });

        let url = format!("{}/setMyCommands", self.base_url);
        match self
            .client
            .post(&url)
            .timeout(self.request_timeout())
            .json(&body)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!("registered Telegram bot commands");
            }
            Ok(resp) => {
                let body = resp.text().await.unwrap_or_default();
                warn!("failed to register Telegram bot commands: {body}");
            }
            Err(e) => {
                warn!("failed to register Telegram bot commands: {e}");
            }
        }
    }
}
