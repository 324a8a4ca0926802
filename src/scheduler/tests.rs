use super::*;
use std::sync::atomic::{AtomicBool, Ordering};

const USER: i64 = 42;

/// Records every dispatched reminder; fails on demand.
#[derive(Default)]
struct RecordingDispatcher {
    sent: std::sync::Mutex<Vec<Reminder>>,
    fail: AtomicBool,
}

impl RecordingDispatcher {
    fn sent(&self) -> Vec<Reminder> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn dispatch(&self, reminder: &Reminder) -> Result<(), HydroError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(HydroError::Dispatch("channel down".into()));
        }
        self.sent.lock().unwrap().push(reminder.clone());
        Ok(())
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
}

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    day().and_hms_opt(h, m, s).unwrap()
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

async fn setup_with(
    config: SchedulerConfig,
) -> (Arc<ReminderScheduler>, Store, Arc<RecordingDispatcher>) {
    let store = Store::in_memory().await.unwrap();
    store
        .ensure_user(USER, Some("tester"), &ReminderConfig::default())
        .await
        .unwrap();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let scheduler = Arc::new(ReminderScheduler::new(
        store.clone(),
        dispatcher.clone(),
        ReminderConfig::default(),
        config,
    ));
    (scheduler, store, dispatcher)
}

async fn setup() -> (Arc<ReminderScheduler>, Store, Arc<RecordingDispatcher>) {
    setup_with(SchedulerConfig::default()).await
}

/// One reminder at 08:00 only.
async fn setup_single_slot() -> (Arc<ReminderScheduler>, Store, Arc<RecordingDispatcher>) {
    let (scheduler, store, dispatcher) = setup().await;
    store.set_time_window(USER, 8, 9).await.unwrap();
    let created = scheduler.schedule_for_day(USER, day()).await.unwrap().unwrap();
    assert_eq!(created.len(), 1);
    (scheduler, store, dispatcher)
}

fn pending_set(reminders: &[Reminder]) -> Vec<(NaiveDateTime, ReminderKind)> {
    reminders.iter().map(|r| (r.scheduled_at, r.kind)).collect()
}

// --- Schedule generation ---

#[tokio::test]
async fn test_default_window_schedule() {
    let (scheduler, _, _) = setup().await;
    let created = scheduler.schedule_for_day(USER, day()).await.unwrap().unwrap();
    let times: Vec<NaiveTime> = created.iter().map(|r| r.scheduled_at.time()).collect();
    assert_eq!(
        times,
        vec![
            hm(8, 0),
            hm(9, 45),
            hm(11, 30),
            hm(13, 15),
            hm(15, 0),
            hm(16, 45),
            hm(18, 30),
            hm(20, 15)
        ]
    );
    assert_eq!(created[0].kind, ReminderKind::Morning);
    assert!(created[1..].iter().all(|r| r.kind == ReminderKind::Regular));
    assert!(created.iter().all(|r| r.attempt == 0 && r.parent_id.is_none()));
    assert!(created.iter().all(|r| r.scheduled_at.date() == day()));
}

#[tokio::test]
async fn test_regeneration_is_idempotent() {
    let (scheduler, store, _) = setup().await;
    scheduler.schedule_for_day(USER, day()).await.unwrap();
    let first = store.list_pending(PendingFilter::user(USER)).await.unwrap();
    scheduler.schedule_for_day(USER, day()).await.unwrap();
    let second = store.list_pending(PendingFilter::user(USER)).await.unwrap();
    assert_eq!(first.len(), 8);
    assert_eq!(pending_set(&first), pending_set(&second));
}

#[tokio::test]
async fn test_unknown_user_not_scheduled() {
    let (scheduler, _, _) = setup().await;
    assert!(scheduler.schedule_for_day(999, day()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_disable_then_enable_notifications() {
    let (scheduler, store, _) = setup().await;
    scheduler.schedule_for_day(USER, day()).await.unwrap();

    store.set_notifications(USER, false).await.unwrap();
    let created = scheduler.schedule_for_day(USER, day()).await.unwrap().unwrap();
    assert!(created.is_empty());
    assert!(store
        .list_pending(PendingFilter::user(USER))
        .await
        .unwrap()
        .is_empty());

    store.set_notifications(USER, true).await.unwrap();
    let created = scheduler.schedule_for_day(USER, day()).await.unwrap().unwrap();
    assert_eq!(created.len(), 8);
}

#[tokio::test]
async fn test_delivered_slots_not_rescheduled() {
    let (scheduler, _, dispatcher) = setup().await;
    scheduler.schedule_for_day(USER, day()).await.unwrap();
    scheduler.run_cycle(at(8, 0, 30)).await.unwrap();
    assert_eq!(dispatcher.sent().len(), 1);

    let created = scheduler.schedule_for_day(USER, day()).await.unwrap().unwrap();
    assert_eq!(created.len(), 7);
    assert!(created.iter().all(|r| r.scheduled_at != at(8, 0, 0)));
}

#[tokio::test]
async fn test_cancel_user_reminders() {
    let (scheduler, store, _) = setup().await;
    scheduler.schedule_for_day(USER, day()).await.unwrap();
    assert_eq!(scheduler.cancel_user_reminders(USER).await.unwrap(), 8);
    assert!(store
        .list_pending(PendingFilter::user(USER))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_schedule_projection() {
    let (scheduler, store, _) = setup().await;
    assert_eq!(scheduler.reminder_schedule().unwrap().len(), 8);

    store.set_time_window(USER, 9, 12).await.unwrap();
    assert_eq!(
        scheduler.user_reminder_schedule(USER).await.unwrap(),
        vec![hm(9, 0), hm(10, 45)]
    );
    // Unknown users fall back to the configured window.
    assert_eq!(scheduler.user_reminder_schedule(999).await.unwrap().len(), 8);
}

// --- Transitions ---

#[tokio::test]
async fn test_mark_is_one_way() {
    let (scheduler, store, _) = setup_single_slot().await;
    let r = store.list_pending(PendingFilter::user(USER)).await.unwrap()[0].clone();
    assert!(scheduler.mark_completed(&r.id).await.unwrap());
    assert!(!scheduler.mark_completed(&r.id).await.unwrap());
    assert!(!scheduler.mark_skipped(&r.id).await.unwrap());
    assert!(!scheduler.mark_completed("missing").await.unwrap());
}

#[tokio::test]
async fn test_postpone_pending() {
    let (scheduler, store, _) = setup_single_slot().await;
    let r = store.list_pending(PendingFilter::user(USER)).await.unwrap()[0].clone();
    assert!(scheduler.postpone(&r.id, 10).await.unwrap());
    let moved = store.get_reminder(&r.id).await.unwrap().unwrap();
    assert_eq!(moved.scheduled_at, at(8, 10, 0));
    assert_eq!(moved.status, ReminderStatus::Pending);
    assert_eq!(moved.attempt, 0);
}

#[tokio::test]
async fn test_create_follow_up() {
    let (scheduler, store, _) = setup_single_slot().await;
    store
        .ensure_user(7, None, &ReminderConfig::default())
        .await
        .unwrap();
    let original = store.list_pending(PendingFilter::user(USER)).await.unwrap()[0].clone();

    assert!(scheduler
        .create_follow_up(7, &original.id)
        .await
        .unwrap()
        .is_none());
    assert!(scheduler
        .create_follow_up(USER, "missing")
        .await
        .unwrap()
        .is_none());

    let follow_up = scheduler
        .create_follow_up(USER, &original.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(follow_up.kind, ReminderKind::FollowUp);
    assert_eq!(follow_up.attempt, 1);
    assert_eq!(follow_up.scheduled_at, at(8, 5, 0));
    assert_eq!(follow_up.parent_id.as_deref(), Some(original.id.as_str()));

    // One chain per original.
    assert!(scheduler
        .create_follow_up(USER, &original.id)
        .await
        .unwrap()
        .is_none());
}

// --- Poll cycle ---

#[tokio::test]
async fn test_cycle_delivers_due_reminders() {
    let (scheduler, store, dispatcher) = setup().await;
    scheduler.schedule_for_day(USER, day()).await.unwrap();

    let report = scheduler.run_cycle(at(8, 0, 30)).await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(report.escalated, 0);

    let sent = dispatcher.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, ReminderKind::Morning);
    let stored = store.get_reminder(&sent[0].id).await.unwrap().unwrap();
    assert_eq!(stored.status, ReminderStatus::Completed);

    // Nothing new is due a few seconds later.
    let report = scheduler.run_cycle(at(8, 1, 0)).await.unwrap();
    assert!(report.is_idle());
    assert_eq!(dispatcher.sent().len(), 1);
}

#[tokio::test]
async fn test_failed_delivery_is_skipped_without_follow_up() {
    let (scheduler, store, dispatcher) = setup_single_slot().await;
    dispatcher.fail.store(true, Ordering::SeqCst);

    let report = scheduler.run_cycle(at(8, 0, 30)).await.unwrap();
    assert_eq!(report.failed, 1);
    let all = store.reminders_on(USER, day()).await.unwrap();
    assert_eq!(all[0].status, ReminderStatus::Skipped);

    dispatcher.fail.store(false, Ordering::SeqCst);
    let report = scheduler.run_cycle(at(8, 10, 0)).await.unwrap();
    assert_eq!(report.escalated, 0);
    assert_eq!(store.reminders_on(USER, day()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_stale_reminders_are_skipped() {
    let (scheduler, store, dispatcher) = setup().await;
    scheduler.schedule_for_day(USER, day()).await.unwrap();

    let report = scheduler.run_cycle(at(10, 0, 0)).await.unwrap();
    assert_eq!(report.stale, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(dispatcher.sent()[0].scheduled_at, at(9, 45, 0));

    let all = store.reminders_on(USER, day()).await.unwrap();
    assert_eq!(all[0].status, ReminderStatus::Skipped);
    assert_eq!(all[1].status, ReminderStatus::Completed);
}

#[tokio::test]
async fn test_capped_follow_up_is_skipped() {
    let (scheduler, store, dispatcher) = setup().await;
    let capped = store
        .create_reminder(USER, at(8, 0, 0), ReminderKind::FollowUp, 3, None)
        .await
        .unwrap();

    let report = scheduler.run_cycle(at(8, 0, 30)).await.unwrap();
    assert_eq!(report.capped, 1);
    assert!(dispatcher.sent().is_empty());
    let stored = store.get_reminder(&capped.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ReminderStatus::Skipped);
}

#[tokio::test]
async fn test_escalation_chain_terminates_at_cap() {
    let (scheduler, store, dispatcher) = setup_single_slot().await;

    scheduler.run_cycle(at(8, 0, 30)).await.unwrap();
    for minute in [5, 10, 15] {
        let report = scheduler.run_cycle(at(8, minute, 30)).await.unwrap();
        assert_eq!(report.escalated, 1, "escalation at 08:{minute:02}");
        scheduler.run_cycle(at(8, minute + 1, 0)).await.unwrap();
    }
    let report = scheduler.run_cycle(at(8, 30, 0)).await.unwrap();
    assert!(report.is_idle());

    let attempts: Vec<u32> = dispatcher.sent().iter().map(|r| r.attempt).collect();
    assert_eq!(attempts, vec![0, 1, 2]);

    let chain = store.reminders_on(USER, day()).await.unwrap();
    assert_eq!(chain.len(), 4);
    for pair in chain.windows(2) {
        assert_eq!(pair[1].attempt, pair[0].attempt + 1);
        assert_eq!(pair[1].parent_id.as_deref(), Some(pair[0].id.as_str()));
    }
    let last = chain.last().unwrap();
    assert_eq!(last.attempt, 3);
    assert_eq!(last.status, ReminderStatus::Skipped);
}

#[tokio::test]
async fn test_intake_prevents_escalation() {
    let (scheduler, store, _) = setup_single_slot().await;
    scheduler.run_cycle(at(8, 0, 30)).await.unwrap();
    store
        .add_intake(USER, 250, None, at(8, 2, 0))
        .await
        .unwrap();

    let report = scheduler.run_cycle(at(8, 10, 0)).await.unwrap();
    assert_eq!(report.escalated, 0);
}

#[tokio::test]
async fn test_no_escalation_when_disabled() {
    let config = SchedulerConfig {
        auto_follow_up: false,
        ..Default::default()
    };
    let (scheduler, store, _) = setup_with(config).await;
    store.set_time_window(USER, 8, 9).await.unwrap();
    scheduler.schedule_for_day(USER, day()).await.unwrap();

    scheduler.run_cycle(at(8, 0, 30)).await.unwrap();
    let report = scheduler.run_cycle(at(8, 10, 0)).await.unwrap();
    assert_eq!(report.escalated, 0);
}

#[tokio::test]
async fn test_no_escalation_for_muted_user() {
    let (scheduler, store, _) = setup_single_slot().await;
    scheduler.run_cycle(at(8, 0, 30)).await.unwrap();
    store.set_notifications(USER, false).await.unwrap();

    let report = scheduler.run_cycle(at(8, 10, 0)).await.unwrap();
    assert_eq!(report.escalated, 0);
}

#[tokio::test]
async fn test_daily_rollover() {
    let (scheduler, store, _) = setup().await;
    store
        .ensure_user(7, None, &ReminderConfig::default())
        .await
        .unwrap();
    store.set_notifications(7, false).await.unwrap();

    let report = scheduler.run_cycle(at(7, 0, 0)).await.unwrap();
    assert_eq!(report.scheduled_users, 1);
    assert_eq!(store.reminders_on(USER, day()).await.unwrap().len(), 8);
    assert!(store.reminders_on(7, day()).await.unwrap().is_empty());

    // Only once per day.
    let report = scheduler.run_cycle(at(7, 30, 0)).await.unwrap();
    assert_eq!(report.scheduled_users, 0);
    assert_eq!(store.reminders_on(USER, day()).await.unwrap().len(), 8);
}

// --- Snooze ---

#[tokio::test]
async fn test_snooze_pending_postpones() {
    let (scheduler, store, _) = setup_single_slot().await;
    let r = store.list_pending(PendingFilter::user(USER)).await.unwrap()[0].clone();
    let outcome = scheduler
        .snooze(USER, &r.id, 10, at(7, 55, 0))
        .await
        .unwrap();
    assert_eq!(outcome, Snooze::Postponed(at(8, 10, 0)));
    assert_eq!(
        scheduler.snooze(7, &r.id, 10, at(7, 55, 0)).await.unwrap(),
        Snooze::Ignored
    );
}

#[tokio::test]
async fn test_snooze_delivered_chains_follow_up() {
    let (scheduler, store, _) = setup_single_slot().await;
    scheduler.run_cycle(at(8, 0, 30)).await.unwrap();
    let original = store.reminders_on(USER, day()).await.unwrap()[0].clone();

    let outcome = scheduler
        .snooze(USER, &original.id, 10, at(8, 1, 0))
        .await
        .unwrap();
    let Snooze::FollowUp(follow_up) = outcome else {
        panic!("expected a follow-up, got {outcome:?}");
    };
    assert_eq!(follow_up.scheduled_at, at(8, 11, 0));
    assert_eq!(follow_up.attempt, 1);

    // A second press does not start another chain.
    assert_eq!(
        scheduler
            .snooze(USER, &original.id, 10, at(8, 2, 0))
            .await
            .unwrap(),
        Snooze::Ignored
    );
}

// --- Lifecycle ---

#[tokio::test]
async fn test_start_stop() {
    let (scheduler, _, _) = setup().await;
    // Stopping a scheduler that never ran is fine.
    scheduler.stop().await;
    assert!(!scheduler.is_running());

    assert!(scheduler.start());
    assert!(!scheduler.start());
    assert!(scheduler.is_running());

    scheduler.stop().await;
    assert!(!scheduler.is_running());

    assert!(scheduler.start());
    scheduler.stop().await;
}

/// Wait until `check` holds, polling every 50 ms, for at most `secs`.
async fn eventually(secs: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(secs);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    check()
}

fn fast_loop() -> SchedulerConfig {
    SchedulerConfig {
        poll_interval_secs: 1,
        error_backoff_secs: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_loop_delivers_due_reminder() {
    let (scheduler, store, dispatcher) = setup_with(fast_loop()).await;
    // Keep the rollover from adding today's slots.
    store.set_notifications(USER, false).await.unwrap();
    let due = Local::now().naive_local() - Duration::minutes(1);
    let reminder = store
        .create_reminder(USER, due, ReminderKind::Regular, 0, None)
        .await
        .unwrap();

    assert!(scheduler.start());
    assert!(eventually(5, || dispatcher.sent().len() == 1).await);
    scheduler.stop().await;

    assert_eq!(dispatcher.sent()[0].id, reminder.id);
    let stored = store.get_reminder(&reminder.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ReminderStatus::Completed);
}

#[tokio::test]
async fn test_loop_survives_failed_cycle() {
    let (scheduler, store, dispatcher) = setup_with(fast_loop()).await;
    store.set_notifications(USER, false).await.unwrap();
    let due = Local::now().naive_local() - Duration::minutes(1);
    let reminder = store
        .create_reminder(USER, due, ReminderKind::Regular, 0, None)
        .await
        .unwrap();
    // A row the store cannot decode makes every cycle fail while it exists.
    sqlx::query(
        "INSERT INTO reminders \
         (id, user_id, scheduled_time, reminder_type, status, attempt_number, created_at) \
         VALUES ('corrupt', ?, ?, 'bogus', 'pending', 0, ?)",
    )
    .bind(USER)
    .bind(hydro_core::models::format_timestamp(&due))
    .bind(hydro_core::models::format_timestamp(&due))
    .execute(store.pool())
    .await
    .unwrap();
    assert!(scheduler.run_cycle(Local::now().naive_local()).await.is_err());

    assert!(scheduler.start());
    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    assert!(scheduler.is_running());
    assert!(dispatcher.sent().is_empty());

    sqlx::query("DELETE FROM reminders WHERE id = 'corrupt'")
        .execute(store.pool())
        .await
        .unwrap();
    assert!(eventually(5, || dispatcher.sent().len() == 1).await);
    assert!(scheduler.is_running());
    scheduler.stop().await;

    assert_eq!(dispatcher.sent()[0].id, reminder.id);
}
