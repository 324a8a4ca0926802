//! Reminder scheduler: daily schedule generation, the delivery poll loop,
//! one-way status transitions, and follow-up escalation.
//!
//! This is the only component that writes reminder status.

#[cfg(test)]
mod tests;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use hydro_core::{
    config::{ReminderConfig, SchedulerConfig},
    error::HydroError,
    models::{Reminder, ReminderKind, ReminderStatus},
    schedule::window_slots,
    traits::Dispatcher,
};
use hydro_memory::{PendingFilter, Store};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What one poll cycle did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Users that got a fresh schedule from the daily rollover.
    pub scheduled_users: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Follow-ups that reached the attempt cap.
    pub capped: usize,
    /// Reminders too far overdue to be worth sending.
    pub stale: usize,
    /// Follow-ups created by escalation.
    pub escalated: usize,
}

impl CycleReport {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of a "remind me later" press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snooze {
    /// The reminder was still pending and now fires at the new time.
    Postponed(NaiveDateTime),
    /// The reminder was already delivered; a follow-up was chained.
    FollowUp(Reminder),
    /// Unknown reminder, someone else's, or the chain is exhausted.
    Ignored,
}

struct Running {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns reminder lifecycle for every user.
pub struct ReminderScheduler {
    store: Store,
    dispatcher: Arc<dyn Dispatcher>,
    reminders: ReminderConfig,
    config: SchedulerConfig,
    /// Serializes schedule regeneration per user.
    user_locks: std::sync::Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    /// Last day the rollover ran for.
    last_rollover: std::sync::Mutex<Option<NaiveDate>>,
    running: std::sync::Mutex<Option<Running>>,
}

impl ReminderScheduler {
    pub fn new(
        store: Store,
        dispatcher: Arc<dyn Dispatcher>,
        reminders: ReminderConfig,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            reminders,
            config,
            user_locks: std::sync::Mutex::new(HashMap::new()),
            last_rollover: std::sync::Mutex::new(None),
            running: std::sync::Mutex::new(None),
        }
    }

    fn user_lock(&self, user_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(user_id).or_default().clone()
    }

    // --- Schedule generation ---

    /// Replace the user's pending reminders with today's schedule.
    ///
    /// Returns `None` for an unknown user and an empty list when
    /// notifications are off.
    pub async fn schedule_daily_reminders(
        &self,
        user_id: i64,
    ) -> Result<Option<Vec<Reminder>>, HydroError> {
        self.schedule_for_day(user_id, Local::now().date_naive())
            .await
    }

    /// Replace the user's pending reminders with the schedule for `day`.
    pub async fn schedule_for_day(
        &self,
        user_id: i64,
        day: NaiveDate,
    ) -> Result<Option<Vec<Reminder>>, HydroError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let Some(user) = self.store.get_user(user_id).await? else {
            return Ok(None);
        };

        let cleared = self.store.delete_pending_reminders(user_id).await?;
        if cleared > 0 {
            debug!("cleared {cleared} pending reminders for user {user_id}");
        }

        if !user.notifications_enabled {
            info!("notifications off for user {user_id}, nothing scheduled");
            return Ok(Some(Vec::new()));
        }

        let slots = self.slots_for_window(Some((user.start_hour, user.end_hour)))?;

        // Slots already delivered or skipped today are not sent twice.
        let handled: HashSet<NaiveDateTime> = self
            .store
            .reminders_on(user_id, day)
            .await?
            .into_iter()
            .filter(|r| r.kind != ReminderKind::FollowUp && r.status.is_terminal())
            .map(|r| r.scheduled_at)
            .collect();

        let mut created = Vec::with_capacity(slots.len());
        for (i, slot) in slots.into_iter().enumerate() {
            let at = day.and_time(slot);
            if handled.contains(&at) {
                continue;
            }
            let kind = if i == 0 {
                ReminderKind::Morning
            } else {
                ReminderKind::Regular
            };
            created.push(self.store.create_reminder(user_id, at, kind, 0, None).await?);
        }

        info!(
            "scheduled {} reminders for user {user_id} on {day}",
            created.len()
        );
        Ok(Some(created))
    }

    /// Delete every pending reminder of a user.
    pub async fn cancel_user_reminders(&self, user_id: i64) -> Result<u64, HydroError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        let removed = self.store.delete_pending_reminders(user_id).await?;
        info!("cancelled {removed} pending reminders for user {user_id}");
        Ok(removed)
    }

    /// Slot projection for the configured default window.
    pub fn reminder_schedule(&self) -> Result<Vec<NaiveTime>, HydroError> {
        self.slots_for_window(None)
    }

    /// Slot projection for a user's window, falling back to the configured one.
    pub async fn user_reminder_schedule(&self, user_id: i64) -> Result<Vec<NaiveTime>, HydroError> {
        let window = self.store.get_time_window(user_id).await?;
        self.slots_for_window(window)
    }

    fn slots_for_window(&self, window: Option<(u32, u32)>) -> Result<Vec<NaiveTime>, HydroError> {
        window_slots(window, &self.reminders)
    }

    // --- Status transitions ---

    /// Returns whether the reminder moved from pending to completed.
    pub async fn mark_completed(&self, reminder_id: &str) -> Result<bool, HydroError> {
        self.store
            .set_reminder_status(reminder_id, ReminderStatus::Completed)
            .await
    }

    /// Returns whether the reminder moved from pending to skipped.
    pub async fn mark_skipped(&self, reminder_id: &str) -> Result<bool, HydroError> {
        self.store
            .set_reminder_status(reminder_id, ReminderStatus::Skipped)
            .await
    }

    /// Shift a still-pending reminder. Status and attempt are untouched.
    pub async fn postpone(&self, reminder_id: &str, minutes: i64) -> Result<bool, HydroError> {
        self.store.shift_reminder(reminder_id, minutes).await
    }

    // --- Follow-ups ---

    /// Chain a follow-up to `original_id`, `follow_up_delay_minutes` after it.
    ///
    /// `None` when the original is unknown, belongs to someone else, or
    /// already has a follow-up. The attempt cap is the caller's concern.
    pub async fn create_follow_up(
        &self,
        user_id: i64,
        original_id: &str,
    ) -> Result<Option<Reminder>, HydroError> {
        let Some(original) = self.store.get_reminder(original_id).await? else {
            return Ok(None);
        };
        if original.user_id != user_id {
            return Ok(None);
        }
        let at = original.scheduled_at + self.follow_up_delay();
        self.chain_follow_up(&original, at).await
    }

    async fn chain_follow_up(
        &self,
        original: &Reminder,
        at: NaiveDateTime,
    ) -> Result<Option<Reminder>, HydroError> {
        if self.store.has_follow_up(&original.id).await? {
            return Ok(None);
        }
        let follow_up = self
            .store
            .create_reminder(
                original.user_id,
                at,
                ReminderKind::FollowUp,
                original.attempt + 1,
                Some(&original.id),
            )
            .await?;
        debug!(
            "follow-up {} (attempt {}) chained to {}",
            follow_up.id, follow_up.attempt, original.id
        );
        Ok(Some(follow_up))
    }

    /// "Remind me later" for a reminder the user is looking at.
    pub async fn snooze(
        &self,
        user_id: i64,
        reminder_id: &str,
        minutes: i64,
        now: NaiveDateTime,
    ) -> Result<Snooze, HydroError> {
        let Some(reminder) = self.store.get_reminder(reminder_id).await? else {
            return Ok(Snooze::Ignored);
        };
        if reminder.user_id != user_id {
            return Ok(Snooze::Ignored);
        }

        if reminder.status == ReminderStatus::Pending {
            if self.postpone(reminder_id, minutes).await? {
                return Ok(Snooze::Postponed(
                    reminder.scheduled_at + Duration::minutes(minutes),
                ));
            }
            return Ok(Snooze::Ignored);
        }

        if reminder.attempt >= self.reminders.max_follow_ups {
            return Ok(Snooze::Ignored);
        }
        let at = now + Duration::minutes(minutes);
        Ok(match self.chain_follow_up(&reminder, at).await? {
            Some(follow_up) => Snooze::FollowUp(follow_up),
            None => Snooze::Ignored,
        })
    }

    /// Chain follow-ups to today's delivered reminders nobody acted on.
    pub async fn escalate_unanswered(
        &self,
        now: NaiveDateTime,
    ) -> Result<Vec<Reminder>, HydroError> {
        let day_start = now.date().and_time(NaiveTime::default());
        let cutoff = now - self.follow_up_delay();
        if cutoff < day_start {
            return Ok(Vec::new());
        }

        let mut created = Vec::new();
        for reminder in self.store.unanswered_reminders(day_start, cutoff).await? {
            if reminder.attempt >= self.reminders.max_follow_ups {
                continue;
            }
            if self.store.notifications_enabled(reminder.user_id).await? != Some(true) {
                continue;
            }
            if let Some(follow_up) = self.create_follow_up(reminder.user_id, &reminder.id).await? {
                created.push(follow_up);
            }
        }
        Ok(created)
    }

    fn follow_up_delay(&self) -> Duration {
        Duration::minutes(i64::from(self.reminders.follow_up_delay_minutes))
    }

    // --- Poll loop ---

    /// Run one poll cycle as of `now`.
    pub async fn run_cycle(&self, now: NaiveDateTime) -> Result<CycleReport, HydroError> {
        let mut report = CycleReport {
            scheduled_users: self.rollover(now.date()).await?,
            ..Default::default()
        };

        let stale_after = Duration::minutes(i64::from(self.config.stale_after_minutes));
        for reminder in self.store.list_pending(PendingFilter::due(now)).await? {
            if reminder.kind == ReminderKind::FollowUp
                && reminder.attempt >= self.reminders.max_follow_ups
            {
                if self.mark_skipped(&reminder.id).await? {
                    debug!("reminder {} hit the follow-up cap", reminder.id);
                    report.capped += 1;
                }
                continue;
            }

            if now - reminder.scheduled_at > stale_after {
                if self.mark_skipped(&reminder.id).await? {
                    debug!(
                        "reminder {} is stale (due {}), skipped",
                        reminder.id, reminder.scheduled_at
                    );
                    report.stale += 1;
                }
                continue;
            }

            match self.dispatcher.dispatch(&reminder).await {
                Ok(()) => {
                    if self.mark_completed(&reminder.id).await? {
                        report.delivered += 1;
                    }
                }
                Err(e) => {
                    warn!(
                        "delivery of reminder {} to user {} failed: {e}",
                        reminder.id, reminder.user_id
                    );
                    if self.mark_skipped(&reminder.id).await? {
                        report.failed += 1;
                    }
                }
            }
        }

        if self.config.auto_follow_up {
            report.escalated = self.escalate_unanswered(now).await?.len();
        }

        Ok(report)
    }

    /// Give every notified user without reminders on `today` a schedule.
    /// Runs once per calendar day.
    async fn rollover(&self, today: NaiveDate) -> Result<usize, HydroError> {
        {
            let last = self.last_rollover.lock().unwrap_or_else(PoisonError::into_inner);
            if *last == Some(today) {
                return Ok(0);
            }
        }

        let mut scheduled = 0;
        for user_id in self.store.list_notified_users().await? {
            if !self.store.reminders_on(user_id, today).await?.is_empty() {
                continue;
            }
            if self.schedule_for_day(user_id, today).await?.is_some() {
                scheduled += 1;
            }
        }

        *self.last_rollover.lock().unwrap_or_else(PoisonError::into_inner) = Some(today);
        if scheduled > 0 {
            info!("daily rollover for {today}: scheduled {scheduled} users");
        }
        Ok(scheduled)
    }

    /// Spawn the poll loop. Returns `false` if it is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return false;
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::clone(self).poll_loop(stop_rx));
        *running = Some(Running { stop_tx, handle });
        true
    }

    /// Signal the poll loop to exit and wait for it.
    ///
    /// The pending sleep is cut short; a dispatch already in flight finishes.
    /// Safe to call when the loop never started.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(Running { stop_tx, handle }) = running else {
            return;
        };
        let _ = stop_tx.send(true);
        if let Err(e) = handle.await {
            error!("scheduler task ended abnormally: {e}");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    async fn poll_loop(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        let poll = std::time::Duration::from_secs(self.config.poll_interval_secs);
        let backoff = std::time::Duration::from_secs(self.config.error_backoff_secs);
        info!(
            "scheduler started (poll every {}s)",
            self.config.poll_interval_secs
        );

        loop {
            if *stop_rx.borrow() {
                break;
            }

            let wait = match self.run_cycle(Local::now().naive_local()).await {
                Ok(report) => {
                    if !report.is_idle() {
                        info!(
                            "scheduler cycle: delivered={} failed={} capped={} stale={} escalated={} rollover={}",
                            report.delivered,
                            report.failed,
                            report.capped,
                            report.stale,
                            report.escalated,
                            report.scheduled_users
                        );
                    }
                    poll
                }
                Err(e) => {
                    error!("scheduler cycle failed, retrying in {}s: {e}", backoff.as_secs());
                    backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("scheduler stopped");
    }
}
