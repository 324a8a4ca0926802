use super::*;
use chrono::NaiveDate;
use hydro_core::{config::SchedulerConfig, models::ReminderKind, traits::Dispatcher};
use hydro_memory::PendingFilter;
use std::sync::Arc;

const USER: i64 = 7;

struct NoopDispatcher;

#[async_trait::async_trait]
impl Dispatcher for NoopDispatcher {
    async fn dispatch(&self, _reminder: &hydro_core::models::Reminder) -> Result<(), HydroError> {
        Ok(())
    }
}

/// Everything a command needs, owned in one place.
struct Harness {
    store: Store,
    scheduler: ReminderScheduler,
    progress: ProgressEngine,
    motivation: MotivationManager,
    reminders: ReminderConfig,
}

impl Harness {
    async fn new() -> Self {
        let store = Store::in_memory().await.unwrap();
        let reminders = ReminderConfig::default();
        let scheduler = ReminderScheduler::new(
            store.clone(),
            Arc::new(NoopDispatcher),
            reminders.clone(),
            SchedulerConfig::default(),
        );
        Self {
            progress: ProgressEngine::new(store.clone(), reminders.clone()),
            motivation: MotivationManager::new(store.clone(), reminders.clone()),
            store,
            scheduler,
            reminders,
        }
    }

    fn ctx<'a>(&'a self, text: &'a str) -> CommandContext<'a> {
        CommandContext {
            store: &self.store,
            scheduler: &self.scheduler,
            progress: &self.progress,
            motivation: &self.motivation,
            reminders: &self.reminders,
            sender_id: USER,
            sender_name: Some("Ana"),
            text,
            now: noon(),
        }
    }

    async fn run(&self, text: &str) -> Reply {
        let cmd = Command::parse(text).unwrap();
        handle(cmd, &self.ctx(text)).await
    }

    async fn press(&self, data: &str) -> Reply {
        let callback = Callback::parse(data).unwrap();
        handle_callback(callback, &self.ctx(data)).await
    }

    async fn pending(&self) -> usize {
        self.store
            .list_pending(PendingFilter::user(USER))
            .await
            .unwrap()
            .len()
    }
}

fn noon() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 5, 4)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

// --- parsing ---

#[test]
fn test_parse_all_commands() {
    let cases = [
        ("/start", Command::Start),
        ("/drink", Command::Drink),
        ("/drink 300", Command::Drink),
        ("/water", Command::Drink),
        ("/stats", Command::Stats),
        ("/today", Command::Stats),
        ("/week", Command::Week),
        ("/achievements", Command::Achievements),
        ("/history", Command::History),
        ("/goal 2500", Command::Goal),
        ("/hours 9 21", Command::Hours),
        ("/notify off", Command::Notify),
        ("/schedule", Command::Schedule),
        ("/motivate", Command::Motivate),
        ("/fact", Command::Fact),
        ("/delete confirm", Command::Delete),
        ("/help", Command::Help),
    ];
    for (text, expected) in cases {
        assert_eq!(Command::parse(text), Some(expected), "{text}");
    }
}

#[test]
fn test_parse_strips_botname() {
    assert_eq!(Command::parse("/stats@hydro_bot"), Some(Command::Stats));
}

#[test]
fn test_parse_unknown_and_plain_text() {
    assert_eq!(Command::parse("/unknown"), None);
    assert_eq!(Command::parse("hello there"), None);
    assert_eq!(Command::parse(""), None);
}

#[test]
fn test_callback_parse() {
    assert_eq!(
        Callback::parse("drink:250:abc"),
        Some(Callback::Drink {
            volume_ml: 250,
            reminder_id: Some("abc".into())
        })
    );
    assert_eq!(
        Callback::parse("drink:500:"),
        Some(Callback::Drink {
            volume_ml: 500,
            reminder_id: None
        })
    );
    assert_eq!(
        Callback::parse("later:r1"),
        Some(Callback::Later {
            reminder_id: "r1".into()
        })
    );
    assert_eq!(Callback::parse("week"), Some(Callback::Week));
    assert_eq!(Callback::parse("later:"), None);
    assert_eq!(Callback::parse("drink:lots"), None);
    assert_eq!(Callback::parse("bogus"), None);
}

#[test]
fn test_callback_encode_matches_parse() {
    let cb = Callback::Drink {
        volume_ml: 250,
        reminder_id: Some("3f2a".into()),
    };
    assert_eq!(cb.encode(), "drink:250:3f2a");
    assert_eq!(Callback::parse(&cb.encode()), Some(cb));
}

#[test]
fn test_reminder_controls_carry_reminder_id() {
    let controls = reminder_controls("r9", 250);
    assert_eq!(controls.rows.len(), 2);
    assert_eq!(controls.rows[0][0].data, "drink:250:r9");
    assert_eq!(controls.rows[0][1].data, "drink:500:r9");
    assert_eq!(controls.rows[1][0].data, "later:r9");
}

#[test]
fn test_parse_volume() {
    assert_eq!(intake::parse_volume("300"), Ok(300));
    assert_eq!(intake::parse_volume("300ml"), Ok(300));
    assert!(intake::parse_volume("0").is_err());
    assert!(intake::parse_volume("-5").is_err());
    assert!(intake::parse_volume("9000").is_err());
    assert!(intake::parse_volume("abc").is_err());
}

// --- handlers ---

#[tokio::test]
async fn test_start_registers_and_schedules() {
    let h = Harness::new().await;
    let reply = h.run("/start").await;
    assert!(reply.text.contains("Welcome, Ana"));
    assert!(reply.controls.is_some());
    assert!(h.store.get_user(USER).await.unwrap().is_some());
    // 08:00 to 22:00 every 105 minutes.
    assert_eq!(h.pending().await, 8);

    let again = h.run("/start").await;
    assert!(again.text.contains("Welcome back"));
    assert_eq!(h.pending().await, 8);
}

#[tokio::test]
async fn test_any_command_registers_unknown_sender() {
    let h = Harness::new().await;
    h.run("/stats").await;
    assert!(h.store.get_user(USER).await.unwrap().is_some());
}

#[tokio::test]
async fn test_drink_reports_milestones_and_goal() {
    let h = Harness::new().await;
    h.run("/start").await;

    let first = h.run("/drink 1000").await;
    assert!(first.text.contains("50% done"), "{}", first.text);
    assert!(!first.text.contains("VICTORY"));

    let second = h.run("/drink 1000").await;
    assert!(second.text.contains("VICTORY"), "{}", second.text);
    assert_eq!(h.store.daily_total(USER, noon().date()).await.unwrap(), 2000);
}

#[tokio::test]
async fn test_drink_default_volume_and_rejection() {
    let h = Harness::new().await;
    h.run("/drink").await;
    assert_eq!(h.store.daily_total(USER, noon().date()).await.unwrap(), 250);

    let reply = h.run("/drink 9000").await;
    assert!(reply.text.contains("between 1 and 5000"));
    assert_eq!(h.store.daily_total(USER, noon().date()).await.unwrap(), 250);
}

#[tokio::test]
async fn test_drink_button_completes_own_reminder_only() {
    let h = Harness::new().await;
    h.run("/start").await;
    h.store
        .ensure_user(99, None, &ReminderConfig::default())
        .await
        .unwrap();
    let mine = h
        .store
        .create_reminder(USER, noon(), ReminderKind::Regular, 0, None)
        .await
        .unwrap();
    let theirs = h
        .store
        .create_reminder(99, noon(), ReminderKind::Regular, 0, None)
        .await
        .unwrap();

    h.press(&format!("drink:250:{}", mine.id)).await;
    h.press(&format!("drink:250:{}", theirs.id)).await;

    let mine = h.store.get_reminder(&mine.id).await.unwrap().unwrap();
    let theirs = h.store.get_reminder(&theirs.id).await.unwrap().unwrap();
    assert!(mine.status.is_terminal());
    assert!(!theirs.status.is_terminal());

    let history = h.store.intake_history(USER, 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r.reminder_id.as_deref() != Some(theirs.id.as_str())));
}

#[tokio::test]
async fn test_later_postpones_pending_reminder() {
    let h = Harness::new().await;
    h.run("/start").await;
    let reminder = h
        .store
        .create_reminder(USER, noon(), ReminderKind::Regular, 0, None)
        .await
        .unwrap();

    let reply = h.press(&format!("later:{}", reminder.id)).await;
    assert!(reply.text.contains("12:10"), "{}", reply.text);

    let moved = h.store.get_reminder(&reminder.id).await.unwrap().unwrap();
    assert_eq!(moved.scheduled_at, noon() + chrono::Duration::minutes(10));
}

#[tokio::test]
async fn test_later_unknown_reminder_is_ignored() {
    let h = Harness::new().await;
    let reply = h.press("later:missing").await;
    assert!(reply.text.contains("can't be snoozed"));
}

#[tokio::test]
async fn test_goal_show_and_set() {
    let h = Harness::new().await;
    h.run("/start").await;
    assert!(h.run("/goal").await.text.contains("2000 ml"));

    assert!(h.run("/goal 2500").await.text.contains("2500 ml"));
    assert_eq!(
        h.store.get_user(USER).await.unwrap().unwrap().daily_goal_ml,
        2500
    );

    let rejected = h.run("/goal 50").await;
    assert!(rejected.text.starts_with("Usage"));
    assert_eq!(
        h.store.get_user(USER).await.unwrap().unwrap().daily_goal_ml,
        2500
    );
}

#[tokio::test]
async fn test_hours_regenerates_schedule() {
    let h = Harness::new().await;
    h.run("/start").await;

    let reply = h.run("/hours 9 21").await;
    assert!(reply.text.contains("09:00 to 21:00"), "{}", reply.text);
    assert_eq!(h.store.get_time_window(USER).await.unwrap(), Some((9, 21)));
    assert_eq!(h.pending().await, 7);
}

#[tokio::test]
async fn test_hours_rejects_bad_window() {
    let h = Harness::new().await;
    h.run("/start").await;

    assert!(h.run("/hours 21 9").await.text.starts_with("Invalid hours"));
    assert!(h.run("/hours 9 25").await.text.starts_with("Invalid hours"));
    assert!(h.run("/hours nine").await.text.starts_with("Usage"));
    assert_eq!(h.store.get_time_window(USER).await.unwrap(), Some((8, 22)));
}

#[tokio::test]
async fn test_notify_off_cancels_and_on_reschedules() {
    let h = Harness::new().await;
    h.run("/start").await;
    assert_eq!(h.pending().await, 8);

    h.run("/notify off").await;
    assert_eq!(h.store.notifications_enabled(USER).await.unwrap(), Some(false));
    assert_eq!(h.pending().await, 0);

    // Toggle without argument.
    h.run("/notify").await;
    assert_eq!(h.store.notifications_enabled(USER).await.unwrap(), Some(true));
    assert_eq!(h.pending().await, 8);
}

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let h = Harness::new().await;
    h.run("/start").await;
    h.run("/drink 300").await;

    let warn = h.run("/delete").await;
    assert!(warn.text.contains("/delete confirm"));
    assert!(h.store.get_user(USER).await.unwrap().is_some());

    h.run("/delete confirm").await;
    assert!(h.store.get_user(USER).await.unwrap().is_none());
    assert_eq!(h.pending().await, 0);
    assert!(h.store.intake_history(USER, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stats_and_history_after_intake() {
    let h = Harness::new().await;
    h.run("/start").await;
    assert!(h.run("/history").await.text.contains("No water logged"));

    h.run("/drink 500").await;
    let stats = h.run("/stats").await;
    assert!(stats.text.contains("500"), "{}", stats.text);
    assert!(h.run("/history").await.text.contains("500 ml"));
}

#[tokio::test]
async fn test_help_lists_commands() {
    let h = Harness::new().await;
    let reply = h.run("/help").await;
    for cmd in ["/drink", "/stats", "/goal", "/hours", "/notify", "/delete"] {
        assert!(reply.text.contains(cmd), "missing {cmd}");
    }
}
