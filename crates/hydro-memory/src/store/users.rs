//! User settings: goal, notification window, notifications flag, removal.

use super::{decode_date, decode_ts, Store};
use chrono::{Local, NaiveDate};
use hydro_core::{
    config::ReminderConfig,
    error::HydroError,
    models::{format_timestamp, User, DATE_FORMAT},
};

type UserRow = (
    i64,
    Option<String>,
    i64,
    i64,
    i64,
    i64,
    Option<String>,
    String,
);

const USER_COLUMNS: &str = "user_id, username, daily_goal, start_hour, end_hour, \
     notifications_enabled, last_motivation_date, created_at";

fn user_from_row(row: UserRow) -> Result<User, HydroError> {
    let (id, username, goal, start, end, enabled, last_motivation, created_at) = row;
    Ok(User {
        id,
        username,
        daily_goal_ml: goal,
        start_hour: start.clamp(0, 23) as u32,
        end_hour: end.clamp(0, 23) as u32,
        notifications_enabled: enabled != 0,
        last_motivation_date: last_motivation.as_deref().map(decode_date).transpose()?,
        created_at: decode_ts(&created_at)?,
    })
}

impl Store {
    /// Register a user on first contact; refresh the display name afterwards.
    ///
    /// Returns `true` when the user was newly created.
    pub async fn ensure_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        defaults: &ReminderConfig,
    ) -> Result<bool, HydroError> {
        let created_at = format_timestamp(&Local::now().naive_local());
        let result = sqlx::query(
            "INSERT OR IGNORE INTO users \
             (user_id, username, daily_goal, start_hour, end_hour, notifications_enabled, created_at) \
             VALUES (?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(user_id)
        .bind(username)
        .bind(defaults.daily_goal_ml)
        .bind(defaults.work_start_hour as i64)
        .bind(defaults.work_end_hour as i64)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| HydroError::Memory(format!("create user failed: {e}")))?;

        let created = result.rows_affected() > 0;
        if !created && username.is_some() {
            sqlx::query("UPDATE users SET username = ? WHERE user_id = ?")
                .bind(username)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| HydroError::Memory(format!("update username failed: {e}")))?;
        }
        Ok(created)
    }

    /// Fetch a user by id.
    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, HydroError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| HydroError::Memory(format!("get user failed: {e}")))?;
        row.map(user_from_row).transpose()
    }

    /// Change the daily goal. Returns `false` if the user does not exist.
    pub async fn update_goal(&self, user_id: i64, goal_ml: i64) -> Result<bool, HydroError> {
        let result = sqlx::query("UPDATE users SET daily_goal = ? WHERE user_id = ?")
            .bind(goal_ml)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| HydroError::Memory(format!("update goal failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Turn reminders on or off. Returns `false` if the user does not exist.
    pub async fn set_notifications(&self, user_id: i64, enabled: bool) -> Result<bool, HydroError> {
        let result = sqlx::query("UPDATE users SET notifications_enabled = ? WHERE user_id = ?")
            .bind(enabled as i64)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| HydroError::Memory(format!("update notifications failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether the user wants reminders; `None` for unknown users.
    pub async fn notifications_enabled(&self, user_id: i64) -> Result<Option<bool>, HydroError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT notifications_enabled FROM users WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| HydroError::Memory(format!("get notifications failed: {e}")))?;
        Ok(row.map(|(v,)| v != 0))
    }

    /// Store the notification window. Callers validate the hours first.
    pub async fn set_time_window(
        &self,
        user_id: i64,
        start_hour: u32,
        end_hour: u32,
    ) -> Result<bool, HydroError> {
        let result = sqlx::query("UPDATE users SET start_hour = ?, end_hour = ? WHERE user_id = ?")
            .bind(start_hour as i64)
            .bind(end_hour as i64)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| HydroError::Memory(format!("update time window failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// The user's notification window; `None` for unknown users.
    pub async fn get_time_window(&self, user_id: i64) -> Result<Option<(u32, u32)>, HydroError> {
        let row: Option<(i64, i64)> =
            sqlx::query_as("SELECT start_hour, end_hour FROM users WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| HydroError::Memory(format!("get time window failed: {e}")))?;
        Ok(row.map(|(s, e)| (s.clamp(0, 23) as u32, e.clamp(0, 23) as u32)))
    }

    /// Record the day a special motivation was sent.
    pub async fn update_last_motivation_date(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<(), HydroError> {
        sqlx::query("UPDATE users SET last_motivation_date = ? WHERE user_id = ?")
            .bind(date.format(DATE_FORMAT).to_string())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| HydroError::Memory(format!("update motivation date failed: {e}")))?;
        Ok(())
    }

    /// Ids of every user who currently wants reminders.
    pub async fn list_notified_users(&self) -> Result<Vec<i64>, HydroError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT user_id FROM users WHERE notifications_enabled = 1 ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HydroError::Memory(format!("list users failed: {e}")))?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Count registered users.
    pub async fn count_users(&self) -> Result<i64, HydroError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HydroError::Memory(format!("count users failed: {e}")))?;
        Ok(count)
    }

    /// Remove a user and everything keyed by them. Returns `false` if unknown.
    pub async fn delete_user(&self, user_id: i64) -> Result<bool, HydroError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| HydroError::Memory(format!("delete user: begin failed: {e}")))?;

        for table in ["water_intake", "reminders", "motivation_log"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE user_id = ?"))
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| HydroError::Memory(format!("delete from {table} failed: {e}")))?;
        }

        let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| HydroError::Memory(format!("delete user failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| HydroError::Memory(format!("delete user: commit failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
