//! Motivation log: what was sent, so it is not sent again right away.

use super::{decode_ts, Store};
use chrono::NaiveDateTime;
use hydro_core::{
    error::HydroError,
    models::{format_timestamp, MotivationEntry},
};
use uuid::Uuid;

impl Store {
    /// Record a message sent to a user.
    pub async fn log_motivation(
        &self,
        user_id: i64,
        category: &str,
        text: &str,
        sent_at: NaiveDateTime,
    ) -> Result<(), HydroError> {
        sqlx::query(
            "INSERT INTO motivation_log (id, user_id, message_type, sent_at, message_text) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(category)
        .bind(format_timestamp(&sent_at))
        .bind(text)
        .execute(&self.pool)
        .await
        .map_err(|e| HydroError::Memory(format!("log motivation failed: {e}")))?;
        Ok(())
    }

    /// Messages sent to a user after `since`, newest first.
    pub async fn recent_motivations(
        &self,
        user_id: i64,
        since: NaiveDateTime,
    ) -> Result<Vec<MotivationEntry>, HydroError> {
        let rows: Vec<(String, i64, String, String, String)> = sqlx::query_as(
            "SELECT id, user_id, message_type, sent_at, message_text FROM motivation_log \
             WHERE user_id = ? AND sent_at > ? ORDER BY sent_at DESC",
        )
        .bind(user_id)
        .bind(format_timestamp(&since))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HydroError::Memory(format!("recent motivations failed: {e}")))?;

        rows.into_iter()
            .map(|(id, user_id, category, sent_at, text)| {
                Ok(MotivationEntry {
                    id,
                    user_id,
                    category,
                    sent_at: decode_ts(&sent_at)?,
                    text,
                })
            })
            .collect()
    }
}
