//! Domain records shared by the store, the scheduler, and the progress engine.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage format for every timestamp: local wall-clock time, sortable as text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Storage format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// What triggered a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    /// First slot of the day.
    Morning,
    Regular,
    /// Chained to an unanswered reminder.
    FollowUp,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Regular => "regular",
            Self::FollowUp => "follow_up",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "morning" => Some(Self::Morning),
            "regular" => Some(Self::Regular),
            "follow_up" => Some(Self::FollowUp),
            _ => None,
        }
    }
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reminder lifecycle. `Completed` and `Skipped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Completed,
    Skipped,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheduled prompt to drink water.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub user_id: i64,
    pub scheduled_at: NaiveDateTime,
    pub kind: ReminderKind,
    pub status: ReminderStatus,
    /// 0 for originals, +1 per follow-up link.
    pub attempt: u32,
    /// The reminder this follow-up escalates, if any.
    pub parent_id: Option<String>,
    pub created_at: NaiveDateTime,
}

/// A user and their hydration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub daily_goal_ml: i64,
    pub start_hour: u32,
    pub end_hour: u32,
    pub notifications_enabled: bool,
    pub last_motivation_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

/// One logged drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub id: String,
    pub user_id: i64,
    pub volume_ml: i64,
    pub logged_at: NaiveDateTime,
    pub reminder_id: Option<String>,
}

/// A motivational message previously sent to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotivationEntry {
    pub id: String,
    pub user_id: i64,
    pub category: String,
    pub sent_at: NaiveDateTime,
    pub text: String,
}

/// Format a timestamp the way the store persists it.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts the `T` separator SQLite sometimes emits.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let normalized = s.replace('T', " ");
    NaiveDateTime::parse_from_str(&normalized, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}
