//! Reminder delivery through a messaging channel.

use crate::commands::reminder_controls;
use crate::motivation::MotivationManager;
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use hydro_core::{
    config::ReminderConfig,
    error::HydroError,
    message::OutgoingMessage,
    models::{Reminder, ReminderKind},
    schedule::window_slots,
    traits::{Channel, Dispatcher},
};
use hydro_memory::Store;
use std::sync::Arc;
use tracing::debug;

/// Renders due reminders and sends them to the user's private chat.
///
/// Telegram private chats share their id with the user, so the user id is
/// the reply target.
pub struct ChannelDispatcher {
    channel: Arc<dyn Channel>,
    store: Store,
    motivation: MotivationManager,
    reminders: ReminderConfig,
}

impl ChannelDispatcher {
    pub fn new(
        channel: Arc<dyn Channel>,
        store: Store,
        motivation: MotivationManager,
        reminders: ReminderConfig,
    ) -> Self {
        Self {
            channel,
            store,
            motivation,
            reminders,
        }
    }

    /// Build the outgoing message for one reminder as of `now`.
    pub async fn render(
        &self,
        reminder: &Reminder,
        now: NaiveDateTime,
    ) -> Result<OutgoingMessage, HydroError> {
        let mut text = self.motivation.reminder_text(reminder, now).await?;

        if self.is_last_slot(reminder).await? {
            let day = reminder.scheduled_at.date();
            let current = self.store.daily_total(reminder.user_id, day).await?;
            let goal = self
                .store
                .get_user(reminder.user_id)
                .await?
                .map_or(self.reminders.daily_goal_ml, |u| u.daily_goal_ml);
            let summary = self
                .motivation
                .evening_summary(reminder.user_id, current, goal, now)
                .await?;
            text.push_str("\n\n");
            text.push_str(&summary);
        }

        Ok(OutgoingMessage {
            text,
            controls: Some(reminder_controls(
                &reminder.id,
                self.reminders.water_per_session_ml,
            )),
            reply_target: Some(reminder.user_id.to_string()),
        })
    }

    /// Whether this is the regular reminder in the user's final slot of the day.
    async fn is_last_slot(&self, reminder: &Reminder) -> Result<bool, HydroError> {
        if reminder.kind != ReminderKind::Regular {
            return Ok(false);
        }
        let Some(user) = self.store.get_user(reminder.user_id).await? else {
            return Ok(false);
        };
        let slots = window_slots(Some((user.start_hour, user.end_hour)), &self.reminders)?;
        Ok(slots.last() == Some(&reminder.scheduled_at.time()))
    }
}

#[async_trait]
impl Dispatcher for ChannelDispatcher {
    async fn dispatch(&self, reminder: &Reminder) -> Result<(), HydroError> {
        let message = self.render(reminder, Local::now().naive_local()).await?;
        self.channel
            .send(message)
            .await
            .map_err(|e| HydroError::Dispatch(format!("reminder {}: {e}", reminder.id)))?;
        debug!(
            "reminder {} sent to {} via {}",
            reminder.id,
            reminder.user_id,
            self.channel.name()
        );
        Ok(())
    }
}
