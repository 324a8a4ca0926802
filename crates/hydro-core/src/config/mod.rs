mod channels;
mod defaults;

#[cfg(test)]
mod tests;

pub use channels::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::HydroError;
use defaults::*;

/// Top-level Hydro configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hydro: HydroConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydroConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for HydroConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Memory config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Reminder policy: goals, work window, cadence and follow-up limits.
///
/// Per-user settings (goal, window) start from these values and are then
/// edited through bot commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_daily_goal")]
    pub daily_goal_ml: i64,
    #[serde(default = "default_water_per_session")]
    pub water_per_session_ml: i64,
    #[serde(default = "default_reminder_interval")]
    pub interval_minutes: u32,
    #[serde(default = "default_work_start_hour")]
    pub work_start_hour: u32,
    #[serde(default = "default_work_end_hour")]
    pub work_end_hour: u32,
    #[serde(default = "default_follow_up_delay")]
    pub follow_up_delay_minutes: u32,
    #[serde(default = "default_max_follow_ups")]
    pub max_follow_ups: u32,
    #[serde(default = "default_motivation_cooldown")]
    pub motivation_cooldown_hours: u32,
    /// How far the "remind me later" button pushes a reminder.
    #[serde(default = "default_postpone_minutes")]
    pub postpone_minutes: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            daily_goal_ml: default_daily_goal(),
            water_per_session_ml: default_water_per_session(),
            interval_minutes: default_reminder_interval(),
            work_start_hour: default_work_start_hour(),
            work_end_hour: default_work_end_hour(),
            follow_up_delay_minutes: default_follow_up_delay(),
            max_follow_ups: default_max_follow_ups(),
            motivation_cooldown_hours: default_motivation_cooldown(),
            postpone_minutes: default_postpone_minutes(),
        }
    }
}

impl ReminderConfig {
    /// Reject values that would make scheduling or stats meaningless.
    pub fn validate(&self) -> Result<(), HydroError> {
        if self.daily_goal_ml <= 0 {
            return Err(HydroError::Config(
                "reminders.daily_goal_ml must be greater than 0".into(),
            ));
        }
        if self.water_per_session_ml <= 0 {
            return Err(HydroError::Config(
                "reminders.water_per_session_ml must be greater than 0".into(),
            ));
        }
        if self.interval_minutes == 0 || self.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(HydroError::Config(format!(
                "reminders.interval_minutes must be between 1 and {MAX_INTERVAL_MINUTES}"
            )));
        }
        validate_window(self.work_start_hour, self.work_end_hour)?;
        if self.follow_up_delay_minutes == 0 {
            return Err(HydroError::Config(
                "reminders.follow_up_delay_minutes must be greater than 0".into(),
            ));
        }
        if self.postpone_minutes == 0 {
            return Err(HydroError::Config(
                "reminders.postpone_minutes must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Longest reminder interval: one day.
pub const MAX_INTERVAL_MINUTES: u32 = 24 * 60;

/// Check a notification window: both hours in 0..=23 and `start < end`.
pub fn validate_window(start_hour: u32, end_hour: u32) -> Result<(), HydroError> {
    if start_hour > 23 || end_hour > 23 {
        return Err(HydroError::Config(format!(
            "window hours must be between 0 and 23 (got {start_hour}-{end_hour})"
        )));
    }
    if start_hour >= end_hour {
        return Err(HydroError::Config(format!(
            "window start ({start_hour}) must be before end ({end_hour})"
        )));
    }
    Ok(())
}

/// Scheduler configuration -- the reminder polling loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Sleep after a failed cycle before polling again.
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
    /// Create follow-ups for delivered reminders nobody answered.
    #[serde(default = "default_true")]
    pub auto_follow_up: bool,
    /// Due reminders older than this are skipped instead of delivered.
    #[serde(default = "default_stale_after")]
    pub stale_after_minutes: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_interval(),
            error_backoff_secs: default_error_backoff(),
            auto_follow_up: true,
            stale_after_minutes: default_stale_after(),
        }
    }
}

impl Config {
    /// Validate the whole configuration. Any error here is fatal at startup.
    pub fn validate(&self) -> Result<(), HydroError> {
        self.reminders.validate()?;
        if self.scheduler.poll_interval_secs == 0 || self.scheduler.error_backoff_secs == 0 {
            return Err(HydroError::Config(
                "scheduler intervals must be greater than 0".into(),
            ));
        }
        if self.memory.max_connections == 0 {
            return Err(HydroError::Config(
                "memory.max_connections must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist. The Telegram token may
/// be supplied through `TELEGRAM_BOT_TOKEN` instead of the file.
pub fn load(path: &str) -> Result<Config, HydroError> {
    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HydroError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str::<Config>(&content)
            .map_err(|e| HydroError::Config(format!("failed to parse config: {}", e)))?
    } else {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    };

    if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
        if !token.is_empty() {
            let tg = config
                .channel
                .telegram
                .get_or_insert_with(TelegramConfig::default);
            if tg.bot_token.is_empty() {
                tg.bot_token = token;
                tg.enabled = true;
            }
        }
    }

    Ok(config)
}
