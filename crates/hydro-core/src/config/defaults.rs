//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "Hydro".to_string()
}

pub fn default_data_dir() -> String {
    "~/.hydro".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_db_path() -> String {
    "~/.hydro/data/hydro.db".to_string()
}

pub fn default_max_connections() -> u32 {
    4
}

pub fn default_daily_goal() -> i64 {
    2000
}

pub fn default_water_per_session() -> i64 {
    250
}

pub fn default_reminder_interval() -> u32 {
    105
}

pub fn default_work_start_hour() -> u32 {
    8
}

pub fn default_work_end_hour() -> u32 {
    22
}

pub fn default_follow_up_delay() -> u32 {
    5
}

pub fn default_max_follow_ups() -> u32 {
    3
}

pub fn default_motivation_cooldown() -> u32 {
    24
}

pub fn default_postpone_minutes() -> u32 {
    10
}

pub fn default_poll_interval() -> u64 {
    30
}

pub fn default_error_backoff() -> u64 {
    60
}

pub fn default_stale_after() -> u32 {
    60
}
