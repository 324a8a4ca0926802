use super::*;

#[test]
fn test_reminder_config_defaults() {
    let rc = ReminderConfig::default();
    assert_eq!(rc.daily_goal_ml, 2000);
    assert_eq!(rc.water_per_session_ml, 250);
    assert_eq!(rc.interval_minutes, 105);
    assert_eq!(rc.work_start_hour, 8);
    assert_eq!(rc.work_end_hour, 22);
    assert_eq!(rc.follow_up_delay_minutes, 5);
    assert_eq!(rc.max_follow_ups, 3);
    assert_eq!(rc.motivation_cooldown_hours, 24);
    assert!(rc.validate().is_ok());
}

#[test]
fn test_scheduler_config_defaults() {
    let sc = SchedulerConfig::default();
    assert!(sc.enabled);
    assert_eq!(sc.poll_interval_secs, 30);
    assert_eq!(sc.error_backoff_secs, 60);
    assert!(sc.auto_follow_up);
}

#[test]
fn test_config_from_partial_toml() {
    let toml_str = r#"
        [reminders]
        daily_goal_ml = 2500
        work_start_hour = 7

        [scheduler]
        poll_interval_secs = 10
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.reminders.daily_goal_ml, 2500);
    assert_eq!(cfg.reminders.work_start_hour, 7);
    assert_eq!(cfg.reminders.work_end_hour, 22);
    assert_eq!(cfg.scheduler.poll_interval_secs, 10);
    assert_eq!(cfg.scheduler.error_backoff_secs, 60);
    assert_eq!(cfg.hydro.name, "Hydro");
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_telegram_config_from_toml() {
    let toml_str = r#"
        [channel.telegram]
        enabled = true
        bot_token = "123:abc"
        allowed_users = [42]
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    let tg = cfg.channel.telegram.unwrap();
    assert!(tg.enabled);
    assert_eq!(tg.bot_token, "123:abc");
    assert_eq!(tg.allowed_users, vec![42]);
    assert_eq!(tg.request_timeout_secs, 15);
}

#[test]
fn test_validate_rejects_inverted_window() {
    let rc = ReminderConfig {
        work_start_hour: 22,
        work_end_hour: 8,
        ..Default::default()
    };
    assert!(matches!(rc.validate(), Err(HydroError::Config(_))));
}

#[test]
fn test_validate_rejects_equal_window() {
    assert!(validate_window(9, 9).is_err());
    assert!(validate_window(9, 24).is_err());
    assert!(validate_window(0, 23).is_ok());
}

#[test]
fn test_validate_rejects_non_positive_goal() {
    let rc = ReminderConfig {
        daily_goal_ml: 0,
        ..Default::default()
    };
    assert!(rc.validate().is_err());

    let rc = ReminderConfig {
        interval_minutes: 0,
        ..Default::default()
    };
    assert!(rc.validate().is_err());
}

#[test]
fn test_validate_bounds_interval_to_one_day() {
    let rc = ReminderConfig {
        interval_minutes: MAX_INTERVAL_MINUTES,
        ..Default::default()
    };
    assert!(rc.validate().is_ok());

    for interval in [MAX_INTERVAL_MINUTES + 1, u32::MAX - 100, u32::MAX] {
        let rc = ReminderConfig {
            interval_minutes: interval,
            ..Default::default()
        };
        assert!(rc.validate().is_err(), "{interval}");
    }
}

#[test]
fn test_validate_rejects_zero_poll_interval() {
    let mut cfg = Config::default();
    cfg.scheduler.poll_interval_secs = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/__hydro_test_config__.toml").unwrap();
    assert_eq!(cfg.reminders.daily_goal_ml, 2000);
    assert_eq!(cfg.memory.db_path, "~/.hydro/data/hydro.db");
}

#[test]
fn test_shellexpand_home() {
    let expanded = shellexpand("~/.hydro/data/hydro.db");
    assert!(!expanded.starts_with("~/") || std::env::var_os("HOME").is_none());
    assert_eq!(shellexpand("/tmp/x.db"), "/tmp/x.db");
}
