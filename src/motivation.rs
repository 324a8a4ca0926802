//! Motivation manager: picks message variants without repeating recent
//! ones, logs everything it hands out, and throttles special messages.

use crate::content;
use chrono::{Duration, NaiveDateTime};
use hydro_core::{
    config::ReminderConfig,
    error::HydroError,
    models::{Reminder, ReminderKind},
};
use hydro_memory::Store;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::debug;

/// Categories recorded in the motivation log.
pub mod category {
    pub const WATER_REMINDER: &str = "water_reminder";
    pub const FOLLOW_UP: &str = "follow_up";
    pub const MORNING: &str = "morning";
    pub const INTAKE_CONFIRMATION: &str = "intake_confirmation";
    pub const MILESTONE: &str = "milestone";
    pub const GOAL_ACHIEVED: &str = "goal_achieved";
    pub const EVENING_SUMMARY: &str = "evening_summary";
    pub const SPECIAL: &str = "special";
    pub const FACT: &str = "scientific_fact";
    pub const RANDOM: &str = "random";
}

/// Messages sent within this window are not repeated.
const REPEAT_WINDOW_HOURS: i64 = 1;

/// The random pick looks further back.
const RANDOM_REPEAT_WINDOW_HOURS: i64 = 2;

#[derive(Clone)]
pub struct MotivationManager {
    store: Store,
    reminders: ReminderConfig,
}

impl MotivationManager {
    pub fn new(store: Store, reminders: ReminderConfig) -> Self {
        Self { store, reminders }
    }

    /// Text for a due reminder, chosen by its kind.
    pub async fn reminder_text(
        &self,
        reminder: &Reminder,
        now: NaiveDateTime,
    ) -> Result<String, HydroError> {
        match reminder.kind {
            ReminderKind::Morning => self.morning(reminder.user_id, now).await,
            ReminderKind::Regular => self.water_reminder(reminder.user_id, now).await,
            ReminderKind::FollowUp => self.follow_up(reminder.user_id, now).await,
        }
    }

    pub async fn water_reminder(
        &self,
        user_id: i64,
        now: NaiveDateTime,
    ) -> Result<String, HydroError> {
        let candidates = content::water_reminders(self.reminders.water_per_session_ml);
        self.pick(user_id, category::WATER_REMINDER, candidates, REPEAT_WINDOW_HOURS, now)
            .await
    }

    pub async fn follow_up(&self, user_id: i64, now: NaiveDateTime) -> Result<String, HydroError> {
        let candidates = content::follow_ups(
            self.reminders.water_per_session_ml,
            self.reminders.follow_up_delay_minutes,
        );
        self.pick(user_id, category::FOLLOW_UP, candidates, REPEAT_WINDOW_HOURS, now)
            .await
    }

    pub async fn morning(&self, user_id: i64, now: NaiveDateTime) -> Result<String, HydroError> {
        let text = content::morning(self.reminders.water_per_session_ml);
        self.record(user_id, category::MORNING, text, now).await
    }

    pub async fn intake_confirmation(
        &self,
        user_id: i64,
        volume_ml: i64,
        current_ml: i64,
        goal_ml: i64,
        now: NaiveDateTime,
    ) -> Result<String, HydroError> {
        let text = content::intake_confirmation(volume_ml, current_ml, goal_ml);
        self.record(user_id, category::INTAKE_CONFIRMATION, text, now)
            .await
    }

    /// `None` for percentages that are not milestones.
    pub async fn milestone(
        &self,
        user_id: i64,
        pct: u32,
        current_ml: i64,
        goal_ml: i64,
        now: NaiveDateTime,
    ) -> Result<Option<String>, HydroError> {
        let Some(text) = content::milestone(pct, current_ml, goal_ml) else {
            return Ok(None);
        };
        self.record(user_id, category::MILESTONE, text, now)
            .await
            .map(Some)
    }

    pub async fn goal_achieved(
        &self,
        user_id: i64,
        goal_ml: i64,
        now: NaiveDateTime,
    ) -> Result<String, HydroError> {
        let text = content::goal_achieved(goal_ml);
        self.record(user_id, category::GOAL_ACHIEVED, text, now)
            .await
    }

    pub async fn evening_summary(
        &self,
        user_id: i64,
        current_ml: i64,
        goal_ml: i64,
        now: NaiveDateTime,
    ) -> Result<String, HydroError> {
        let text = content::evening_summary(current_ml, goal_ml);
        self.record(user_id, category::EVENING_SUMMARY, text, now)
            .await
    }

    /// A special motivation, at most once per calendar day and once per
    /// `motivation_cooldown_hours`. `None` when throttled or the user is unknown.
    pub async fn special(
        &self,
        user_id: i64,
        now: NaiveDateTime,
    ) -> Result<Option<String>, HydroError> {
        let Some(user) = self.store.get_user(user_id).await? else {
            return Ok(None);
        };
        if user.last_motivation_date == Some(now.date()) {
            debug!("special motivation already sent today to user {user_id}");
            return Ok(None);
        }

        let cooldown = Duration::hours(i64::from(self.reminders.motivation_cooldown_hours));
        let recent = self.store.recent_motivations(user_id, now - cooldown).await?;
        if recent.iter().any(|m| m.category == category::SPECIAL) {
            debug!("special motivation for user {user_id} still cooling down");
            return Ok(None);
        }

        let candidates = content::SPECIALS.iter().map(|s| s.to_string()).collect();
        let text = self
            .pick(user_id, category::SPECIAL, candidates, REPEAT_WINDOW_HOURS, now)
            .await?;
        self.store
            .update_last_motivation_date(user_id, now.date())
            .await?;
        Ok(Some(text))
    }

    pub async fn fact(&self, user_id: i64, now: NaiveDateTime) -> Result<String, HydroError> {
        let candidates = content::FACTS.iter().map(|s| s.to_string()).collect();
        self.pick(user_id, category::FACT, candidates, REPEAT_WINDOW_HOURS, now)
            .await
    }

    /// Any reminder, special, or fact not sent in the last two hours.
    pub async fn random(&self, user_id: i64, now: NaiveDateTime) -> Result<String, HydroError> {
        let session = self.reminders.water_per_session_ml;
        let mut candidates = content::water_reminders(session);
        candidates.extend(content::follow_ups(
            session,
            self.reminders.follow_up_delay_minutes,
        ));
        candidates.extend(content::SPECIALS.iter().map(|s| s.to_string()));
        candidates.extend(content::FACTS.iter().map(|s| s.to_string()));
        self.pick(
            user_id,
            category::RANDOM,
            candidates,
            RANDOM_REPEAT_WINDOW_HOURS,
            now,
        )
        .await
    }

    /// Choose a variant not sent in the last `window_hours`, falling back to
    /// all of them, and log it.
    async fn pick(
        &self,
        user_id: i64,
        category: &str,
        candidates: Vec<String>,
        window_hours: i64,
        now: NaiveDateTime,
    ) -> Result<String, HydroError> {
        let recent: HashSet<String> = self
            .store
            .recent_motivations(user_id, now - Duration::hours(window_hours))
            .await?
            .into_iter()
            .map(|m| m.text)
            .collect();

        let fresh: Vec<&String> = candidates.iter().filter(|c| !recent.contains(*c)).collect();
        let chosen = {
            let mut rng = rand::thread_rng();
            if fresh.is_empty() {
                candidates.choose(&mut rng).cloned()
            } else {
                fresh.choose(&mut rng).map(|s| (*s).clone())
            }
        };
        let text = chosen
            .ok_or_else(|| HydroError::Config(format!("no {category} messages available")))?;
        self.record(user_id, category, text, now).await
    }

    async fn record(
        &self,
        user_id: i64,
        category: &str,
        text: String,
        now: NaiveDateTime,
    ) -> Result<String, HydroError> {
        self.store
            .log_motivation(user_id, category, &text, now)
            .await?;
        Ok(text)
    }
}
