//! Reminder slot generation for a same-day work window.

use chrono::NaiveTime;

use crate::config::{validate_window, ReminderConfig};
use crate::error::HydroError;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Generate the reminder slots for one day.
///
/// Slots start at `start_hour:00` and advance by `interval_minutes` while the
/// slot's hour is strictly below `end_hour`. The window never crosses midnight.
pub fn generate_slots(
    start_hour: u32,
    end_hour: u32,
    interval_minutes: u32,
) -> Result<Vec<NaiveTime>, HydroError> {
    validate_window(start_hour, end_hour)?;
    if interval_minutes == 0 {
        return Err(HydroError::Config(
            "reminder interval must be greater than 0".into(),
        ));
    }

    let mut slots = Vec::new();
    let mut total = start_hour * 60;
    while total < MINUTES_PER_DAY && total / 60 < end_hour {
        if let Some(slot) = NaiveTime::from_hms_opt(total / 60, total % 60, 0) {
            slots.push(slot);
        }
        match total.checked_add(interval_minutes) {
            Some(next) => total = next,
            None => break,
        }
    }
    Ok(slots)
}

/// Slots for a user's stored window.
///
/// A missing or invalid window falls back to the configured work window.
pub fn window_slots(
    window: Option<(u32, u32)>,
    reminders: &ReminderConfig,
) -> Result<Vec<NaiveTime>, HydroError> {
    let (start, end) = match window {
        Some((start, end)) if validate_window(start, end).is_ok() => (start, end),
        Some((start, end)) => {
            tracing::warn!("invalid stored window {start}-{end}, using configured default");
            (reminders.work_start_hour, reminders.work_end_hour)
        }
        None => (reminders.work_start_hour, reminders.work_end_hour),
    };
    generate_slots(start, end, reminders.interval_minutes)
}

/// First slot strictly after `now`, if any remain today.
pub fn next_slot_after(slots: &[NaiveTime], now: NaiveTime) -> Option<NaiveTime> {
    slots.iter().copied().find(|slot| *slot > now)
}
