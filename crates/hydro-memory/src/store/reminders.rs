//! Reminder CRUD and one-way status transitions.

use super::{day_bounds, decode_ts, Store};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use hydro_core::{
    error::HydroError,
    models::{format_timestamp, Reminder, ReminderKind, ReminderStatus},
};
use uuid::Uuid;

type ReminderRow = (
    String,
    i64,
    String,
    String,
    String,
    i64,
    Option<String>,
    String,
);

const REMINDER_COLUMNS: &str =
    "id, user_id, scheduled_time, reminder_type, status, attempt_number, parent_id, created_at";

fn reminder_from_row(row: ReminderRow) -> Result<Reminder, HydroError> {
    let (id, user_id, scheduled, kind, status, attempt, parent_id, created_at) = row;
    let kind = ReminderKind::parse(&kind)
        .ok_or_else(|| HydroError::Memory(format!("unknown reminder type '{kind}' on {id}")))?;
    let status = ReminderStatus::parse(&status)
        .ok_or_else(|| HydroError::Memory(format!("unknown reminder status '{status}' on {id}")))?;
    Ok(Reminder {
        scheduled_at: decode_ts(&scheduled)?,
        created_at: decode_ts(&created_at)?,
        id,
        user_id,
        kind,
        status,
        attempt: attempt.max(0) as u32,
        parent_id,
    })
}

/// Which pending reminders to list.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingFilter {
    /// Restrict to one user.
    pub user_id: Option<i64>,
    /// Only reminders scheduled at or before this instant.
    pub due_by: Option<NaiveDateTime>,
}

impl PendingFilter {
    /// Everything pending and due by `now`, for every user.
    pub fn due(now: NaiveDateTime) -> Self {
        Self {
            user_id: None,
            due_by: Some(now),
        }
    }

    /// Everything pending for one user, regardless of time.
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            due_by: None,
        }
    }
}

impl Store {
    /// Insert a new pending reminder.
    pub async fn create_reminder(
        &self,
        user_id: i64,
        scheduled_at: NaiveDateTime,
        kind: ReminderKind,
        attempt: u32,
        parent_id: Option<&str>,
    ) -> Result<Reminder, HydroError> {
        let id = Uuid::new_v4().to_string();
        let created_at = Local::now().naive_local();
        sqlx::query(
            "INSERT INTO reminders \
             (id, user_id, scheduled_time, reminder_type, status, attempt_number, parent_id, created_at) \
             VALUES (?, ?, ?, ?, 'pending', ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(format_timestamp(&scheduled_at))
        .bind(kind.as_str())
        .bind(attempt as i64)
        .bind(parent_id)
        .bind(format_timestamp(&created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| HydroError::Memory(format!("create reminder failed: {e}")))?;

        Ok(Reminder {
            id,
            user_id,
            scheduled_at,
            kind,
            status: ReminderStatus::Pending,
            attempt,
            parent_id: parent_id.map(str::to_string),
            created_at,
        })
    }

    /// Fetch one reminder by id.
    pub async fn get_reminder(&self, id: &str) -> Result<Option<Reminder>, HydroError> {
        let row: Option<ReminderRow> =
            sqlx::query_as(&format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| HydroError::Memory(format!("get reminder failed: {e}")))?;
        row.map(reminder_from_row).transpose()
    }

    /// List pending reminders, oldest scheduled first.
    pub async fn list_pending(&self, filter: PendingFilter) -> Result<Vec<Reminder>, HydroError> {
        let mut sql = format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE status = 'pending'");
        if filter.user_id.is_some() {
            sql.push_str(" AND user_id = ?");
        }
        if filter.due_by.is_some() {
            sql.push_str(" AND scheduled_time <= ?");
        }
        sql.push_str(" ORDER BY scheduled_time ASC, attempt_number ASC");

        let mut query = sqlx::query_as::<_, ReminderRow>(&sql);
        if let Some(user_id) = filter.user_id {
            query = query.bind(user_id);
        }
        if let Some(due_by) = filter.due_by {
            query = query.bind(format_timestamp(&due_by));
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| HydroError::Memory(format!("list pending reminders failed: {e}")))?;
        rows.into_iter().map(reminder_from_row).collect()
    }

    /// Every reminder of a user scheduled on `date`, in schedule order.
    pub async fn reminders_on(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<Reminder>, HydroError> {
        let (start, end) = day_bounds(date);
        let rows: Vec<ReminderRow> = sqlx::query_as(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders \
             WHERE user_id = ? AND scheduled_time >= ? AND scheduled_time < ? \
             ORDER BY scheduled_time ASC, attempt_number ASC"
        ))
        .bind(user_id)
        .bind(&start)
        .bind(&end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HydroError::Memory(format!("reminders of day failed: {e}")))?;
        rows.into_iter().map(reminder_from_row).collect()
    }

    /// Move a pending reminder to a terminal status.
    ///
    /// Returns `false` when the reminder is unknown or already terminal.
    pub async fn set_reminder_status(
        &self,
        id: &str,
        status: ReminderStatus,
    ) -> Result<bool, HydroError> {
        if !status.is_terminal() {
            return Err(HydroError::Memory(format!(
                "refusing to move reminder {id} back to {status}"
            )));
        }
        let result =
            sqlx::query("UPDATE reminders SET status = ? WHERE id = ? AND status = 'pending'")
                .bind(status.as_str())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| HydroError::Memory(format!("update reminder status failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Shift a pending reminder by `minutes`. Returns `false` if nothing matched.
    pub async fn shift_reminder(&self, id: &str, minutes: i64) -> Result<bool, HydroError> {
        let Some(reminder) = self.get_reminder(id).await? else {
            return Ok(false);
        };
        let new_time = reminder.scheduled_at + Duration::minutes(minutes);
        let result = sqlx::query(
            "UPDATE reminders SET scheduled_time = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(format_timestamp(&new_time))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| HydroError::Memory(format!("postpone reminder failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every pending reminder of a user. History is kept.
    pub async fn delete_pending_reminders(&self, user_id: i64) -> Result<u64, HydroError> {
        let result = sqlx::query("DELETE FROM reminders WHERE user_id = ? AND status = 'pending'")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| HydroError::Memory(format!("delete pending reminders failed: {e}")))?;
        Ok(result.rows_affected())
    }

    /// Whether a follow-up already escalates `parent_id`.
    pub async fn has_follow_up(&self, parent_id: &str) -> Result<bool, HydroError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM reminders WHERE parent_id = ?")
                .bind(parent_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| HydroError::Memory(format!("follow-up lookup failed: {e}")))?;
        Ok(count > 0)
    }

    /// Delivered reminders in `[from, until]` with no follow-up and no intake
    /// logged by their user since they were scheduled.
    pub async fn unanswered_reminders(
        &self,
        from: NaiveDateTime,
        until: NaiveDateTime,
    ) -> Result<Vec<Reminder>, HydroError> {
        let rows: Vec<ReminderRow> = sqlx::query_as(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders r \
             WHERE r.status = 'completed' \
             AND r.scheduled_time >= ? AND r.scheduled_time <= ? \
             AND NOT EXISTS (SELECT 1 FROM reminders c WHERE c.parent_id = r.id) \
             AND NOT EXISTS (SELECT 1 FROM water_intake w \
                             WHERE w.user_id = r.user_id AND w.timestamp >= r.scheduled_time) \
             ORDER BY r.scheduled_time ASC"
        ))
        .bind(format_timestamp(&from))
        .bind(format_timestamp(&until))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HydroError::Memory(format!("unanswered reminders failed: {e}")))?;
        rows.into_iter().map(reminder_from_row).collect()
    }
}
