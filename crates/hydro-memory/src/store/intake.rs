//! The append-only intake ledger and its aggregates.

use super::{day_bounds, decode_date, decode_ts, Store};
use chrono::{NaiveDate, NaiveDateTime};
use hydro_core::{
    error::HydroError,
    models::{format_timestamp, IntakeRecord},
};
use uuid::Uuid;

type IntakeRow = (String, i64, i64, String, Option<String>);

fn intake_from_row(row: IntakeRow) -> Result<IntakeRecord, HydroError> {
    let (id, user_id, volume_ml, ts, reminder_id) = row;
    Ok(IntakeRecord {
        id,
        user_id,
        volume_ml,
        logged_at: decode_ts(&ts)?,
        reminder_id,
    })
}

impl Store {
    /// Append one intake event.
    pub async fn add_intake(
        &self,
        user_id: i64,
        volume_ml: i64,
        reminder_id: Option<&str>,
        logged_at: NaiveDateTime,
    ) -> Result<IntakeRecord, HydroError> {
        if volume_ml <= 0 {
            return Err(HydroError::Memory(format!(
                "intake volume must be positive (got {volume_ml})"
            )));
        }
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO water_intake (id, user_id, volume, timestamp, reminder_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(volume_ml)
        .bind(format_timestamp(&logged_at))
        .bind(reminder_id)
        .execute(&self.pool)
        .await
        .map_err(|e| HydroError::Memory(format!("add intake failed: {e}")))?;

        Ok(IntakeRecord {
            id,
            user_id,
            volume_ml,
            logged_at,
            reminder_id: reminder_id.map(str::to_string),
        })
    }

    /// Total volume logged on `date`.
    pub async fn daily_total(&self, user_id: i64, date: NaiveDate) -> Result<i64, HydroError> {
        let (start, end) = day_bounds(date);
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(volume), 0) FROM water_intake \
             WHERE user_id = ? AND timestamp >= ? AND timestamp < ?",
        )
        .bind(user_id)
        .bind(&start)
        .bind(&end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| HydroError::Memory(format!("daily total failed: {e}")))?;
        Ok(total)
    }

    /// Every intake on `date`, oldest first.
    pub async fn intake_on(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<IntakeRecord>, HydroError> {
        let (start, end) = day_bounds(date);
        let rows: Vec<IntakeRow> = sqlx::query_as(
            "SELECT id, user_id, volume, timestamp, reminder_id FROM water_intake \
             WHERE user_id = ? AND timestamp >= ? AND timestamp < ? \
             ORDER BY timestamp ASC",
        )
        .bind(user_id)
        .bind(&start)
        .bind(&end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HydroError::Memory(format!("intake of day failed: {e}")))?;
        rows.into_iter().map(intake_from_row).collect()
    }

    /// Most recent intakes, newest first, at most `limit`.
    pub async fn intake_history(
        &self,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<IntakeRecord>, HydroError> {
        let rows: Vec<IntakeRow> = sqlx::query_as(
            "SELECT id, user_id, volume, timestamp, reminder_id FROM water_intake \
             WHERE user_id = ? ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HydroError::Memory(format!("intake history failed: {e}")))?;
        rows.into_iter().map(intake_from_row).collect()
    }

    /// Per-day totals for `from..=to`, only for days that have data, oldest first.
    pub async fn daily_totals(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, i64)>, HydroError> {
        let (start, _) = day_bounds(from);
        let (_, end) = day_bounds(to);
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT substr(timestamp, 1, 10) AS day, SUM(volume) FROM water_intake \
             WHERE user_id = ? AND timestamp >= ? AND timestamp < ? \
             GROUP BY day ORDER BY day",
        )
        .bind(user_id)
        .bind(&start)
        .bind(&end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HydroError::Memory(format!("daily totals failed: {e}")))?;

        rows.into_iter()
            .map(|(day, total)| Ok((decode_date(&day)?, total)))
            .collect()
    }
}
