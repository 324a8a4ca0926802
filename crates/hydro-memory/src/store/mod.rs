//! SQLite-backed persistent store.
//!
//! Split into focused submodules:
//! - `users`: user settings, notification window, account removal
//! - `intake`: the append-only intake ledger and its aggregates
//! - `reminders`: reminder CRUD and status transitions
//! - `motivation`: motivation log used to avoid repeats

mod intake;
mod motivation;
mod reminders;
mod users;


pub use reminders::PendingFilter;

use chrono::{Days, NaiveDate, NaiveDateTime};
use hydro_core::{
    config::MemoryConfig,
    error::HydroError,
    models::{format_timestamp, parse_timestamp, DATE_FORMAT},
    shellexpand,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Persistent store backed by SQLite.
///
/// Cheap to clone; clones share one connection pool. Every method is a
/// single statement or a single transaction.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Create a new store, running migrations on first use.
    pub async fn new(config: &MemoryConfig) -> Result<Self, HydroError> {
        let db_path = shellexpand(&config.db_path);

        // Ensure parent directory exists.
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| HydroError::Memory(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| HydroError::Memory(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(opts)
            .await
            .map_err(|e| HydroError::Memory(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("Store initialized at {db_path}");

        Ok(Self { pool })
    }

    /// Open a private in-memory database with the full schema.
    ///
    /// Single connection: every pooled connection to `:memory:` would
    /// otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self, HydroError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| HydroError::Memory(format!("invalid db path: {e}")))?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| HydroError::Memory(format!("failed to open in-memory db: {e}")))?;
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the database file size in bytes.
    pub async fn db_size(&self) -> Result<u64, HydroError> {
        let (page_count,): (i64,) = sqlx::query_as("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HydroError::Memory(format!("pragma failed: {e}")))?;

        let (page_size,): (i64,) = sqlx::query_as("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HydroError::Memory(format!("pragma failed: {e}")))?;

        Ok((page_count * page_size) as u64)
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), HydroError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| HydroError::Memory(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] = &[
            ("001_init", include_str!("../../migrations/001_init.sql")),
            (
                "002_reminder_chain",
                include_str!("../../migrations/002_reminder_chain.sql"),
            ),
        ];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        HydroError::Memory(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            // Apply and record in one transaction.
            let mut tx = pool
                .begin()
                .await
                .map_err(|e| HydroError::Memory(format!("migration {name}: begin failed: {e}")))?;

            sqlx::raw_sql(sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| HydroError::Memory(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    HydroError::Memory(format!("failed to record migration {name}: {e}"))
                })?;

            tx.commit()
                .await
                .map_err(|e| HydroError::Memory(format!("migration {name}: commit failed: {e}")))?;

            info!("applied migration {name}");
        }
        Ok(())
    }
}

/// Decode a stored timestamp column.
pub(crate) fn decode_ts(raw: &str) -> Result<NaiveDateTime, HydroError> {
    parse_timestamp(raw)
        .ok_or_else(|| HydroError::Memory(format!("corrupt timestamp in store: {raw}")))
}

/// Decode a stored date column.
pub(crate) fn decode_date(raw: &str) -> Result<NaiveDate, HydroError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| HydroError::Memory(format!("corrupt date in store '{raw}': {e}")))
}

/// `[day 00:00:00, next day 00:00:00)` as stored text.
pub(crate) fn day_bounds(date: NaiveDate) -> (String, String) {
    let start = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    let end = date
        .checked_add_days(Days::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(start);
    (format_timestamp(&start), format_timestamp(&end))
}
