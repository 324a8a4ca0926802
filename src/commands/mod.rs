//! Bot commands and inline-button callbacks.

mod intake;
mod settings;
mod stats;

#[cfg(test)]
mod tests;

use crate::motivation::MotivationManager;
use crate::progress::ProgressEngine;
use crate::scheduler::ReminderScheduler;
use chrono::NaiveDateTime;
use hydro_core::{
    config::ReminderConfig,
    error::HydroError,
    message::{Button, Controls},
};
use hydro_memory::Store;
use tracing::error;

/// Grouped context for command execution.
pub struct CommandContext<'a> {
    pub store: &'a Store,
    pub scheduler: &'a ReminderScheduler,
    pub progress: &'a ProgressEngine,
    pub motivation: &'a MotivationManager,
    pub reminders: &'a ReminderConfig,
    pub sender_id: i64,
    pub sender_name: Option<&'a str>,
    pub text: &'a str,
    /// Local wall-clock time the message is handled at.
    pub now: NaiveDateTime,
}

impl CommandContext<'_> {
    /// Whitespace-separated arguments after the command word.
    fn args(&self) -> Vec<&str> {
        self.text.split_whitespace().skip(1).collect()
    }
}

/// A reply: text plus optional buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub controls: Option<Controls>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            controls: None,
        }
    }

    pub fn with_controls(mut self, controls: Controls) -> Self {
        self.controls = Some(controls);
        self
    }
}

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Drink,
    Stats,
    Week,
    Achievements,
    History,
    Goal,
    Hours,
    Notify,
    Schedule,
    Motivate,
    Fact,
    Delete,
    Help,
}

impl Command {
    /// Parse a command from message text. `None` for anything else.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        // Strip @botname suffix (e.g. "/help@hydro_bot" → "/help").
        let cmd = first.split('@').next().unwrap_or(first);
        match cmd {
            "/start" => Some(Self::Start),
            "/drink" | "/water" => Some(Self::Drink),
            "/stats" | "/today" => Some(Self::Stats),
            "/week" => Some(Self::Week),
            "/achievements" => Some(Self::Achievements),
            "/history" => Some(Self::History),
            "/goal" => Some(Self::Goal),
            "/hours" => Some(Self::Hours),
            "/notify" => Some(Self::Notify),
            "/schedule" => Some(Self::Schedule),
            "/motivate" => Some(Self::Motivate),
            "/fact" => Some(Self::Fact),
            "/delete" => Some(Self::Delete),
            "/help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Inline-button payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    /// `drink:<ml>:<reminder_id?>`
    Drink {
        volume_ml: i64,
        reminder_id: Option<String>,
    },
    /// `later:<reminder_id>`
    Later { reminder_id: String },
    Stats,
    Week,
    Achievements,
    Motivate,
}

impl Callback {
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.splitn(3, ':');
        match parts.next()? {
            "drink" => {
                let volume_ml = parts.next()?.parse().ok()?;
                let reminder_id = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
                Some(Self::Drink {
                    volume_ml,
                    reminder_id,
                })
            }
            "later" => {
                let reminder_id = parts.next().filter(|s| !s.is_empty())?.to_string();
                Some(Self::Later { reminder_id })
            }
            "stats" => Some(Self::Stats),
            "week" => Some(Self::Week),
            "achievements" => Some(Self::Achievements),
            "motivate" => Some(Self::Motivate),
            _ => None,
        }
    }

    /// Encode back into a button payload.
    pub fn encode(&self) -> String {
        match self {
            Self::Drink {
                volume_ml,
                reminder_id,
            } => format!("drink:{volume_ml}:{}", reminder_id.as_deref().unwrap_or("")),
            Self::Later { reminder_id } => format!("later:{reminder_id}"),
            Self::Stats => "stats".to_string(),
            Self::Week => "week".to_string(),
            Self::Achievements => "achievements".to_string(),
            Self::Motivate => "motivate".to_string(),
        }
    }
}

/// Buttons attached to a delivered reminder.
pub fn reminder_controls(reminder_id: &str, session_ml: i64) -> Controls {
    Controls::new()
        .row(vec![
            drink_button(session_ml, Some(reminder_id)),
            drink_button(session_ml * 2, Some(reminder_id)),
        ])
        .row(vec![
            Button::new(
                "⏰ Later",
                Callback::Later {
                    reminder_id: reminder_id.to_string(),
                }
                .encode(),
            ),
            Button::new("📊 Stats", Callback::Stats.encode()),
        ])
}

/// Quick-log and navigation buttons.
pub fn menu_controls(session_ml: i64) -> Controls {
    Controls::new()
        .row(vec![
            drink_button(session_ml, None),
            drink_button(session_ml * 2, None),
        ])
        .row(vec![
            Button::new("📊 Today", Callback::Stats.encode()),
            Button::new("📅 Week", Callback::Week.encode()),
        ])
        .row(vec![
            Button::new("🏆 Achievements", Callback::Achievements.encode()),
            Button::new("✨ Motivate", Callback::Motivate.encode()),
        ])
}

fn drink_button(volume_ml: i64, reminder_id: Option<&str>) -> Button {
    Button::new(
        format!("💧 {volume_ml} ml"),
        Callback::Drink {
            volume_ml,
            reminder_id: reminder_id.map(str::to_string),
        }
        .encode(),
    )
}

/// Register unknown senders; a new user gets today's schedule.
async fn ensure_registered(ctx: &CommandContext<'_>) -> Result<bool, HydroError> {
    let created = ctx
        .store
        .ensure_user(ctx.sender_id, ctx.sender_name, ctx.reminders)
        .await?;
    if created {
        ctx.scheduler
            .schedule_daily_reminders(ctx.sender_id)
            .await?;
    }
    Ok(created)
}

/// Handle a command and return the reply.
pub async fn handle(cmd: Command, ctx: &CommandContext<'_>) -> Reply {
    let result = match cmd {
        Command::Start => settings::handle_start(ctx).await,
        Command::Delete => settings::handle_delete(ctx).await,
        Command::Help => Ok(stats::handle_help(ctx)),
        _ => match ensure_registered(ctx).await {
            Ok(_) => dispatch(cmd, ctx).await,
            Err(e) => Err(e),
        },
    };
    result.unwrap_or_else(|e| {
        error!("command {cmd:?} from {} failed: {e}", ctx.sender_id);
        Reply::text(format!("Error: {e}"))
    })
}

async fn dispatch(cmd: Command, ctx: &CommandContext<'_>) -> Result<Reply, HydroError> {
    match cmd {
        Command::Drink => {
            let volume = ctx.args().first().map(|a| intake::parse_volume(a));
            match volume {
                Some(Err(msg)) => Ok(Reply::text(msg)),
                Some(Ok(ml)) => intake::handle_drink(ctx, ml, None).await,
                None => intake::handle_drink(ctx, ctx.reminders.water_per_session_ml, None).await,
            }
        }
        Command::Stats => stats::handle_stats(ctx).await,
        Command::Week => stats::handle_week(ctx).await,
        Command::Achievements => stats::handle_achievements(ctx).await,
        Command::History => intake::handle_history(ctx).await,
        Command::Goal => settings::handle_goal(ctx).await,
        Command::Hours => settings::handle_hours(ctx).await,
        Command::Notify => settings::handle_notify(ctx).await,
        Command::Schedule => stats::handle_schedule(ctx).await,
        Command::Motivate => stats::handle_motivate(ctx).await,
        Command::Fact => stats::handle_fact(ctx).await,
        Command::Start | Command::Delete | Command::Help => Ok(stats::handle_help(ctx)),
    }
}

/// Handle an inline-button press and return the reply.
pub async fn handle_callback(callback: Callback, ctx: &CommandContext<'_>) -> Reply {
    let result = match ensure_registered(ctx).await {
        Ok(_) => match &callback {
            Callback::Drink {
                volume_ml,
                reminder_id,
            } => match intake::validate_volume(*volume_ml) {
                Ok(ml) => intake::handle_drink(ctx, ml, reminder_id.as_deref()).await,
                Err(msg) => Ok(Reply::text(msg)),
            },
            Callback::Later { reminder_id } => intake::handle_later(ctx, reminder_id).await,
            Callback::Stats => stats::handle_stats(ctx).await,
            Callback::Week => stats::handle_week(ctx).await,
            Callback::Achievements => stats::handle_achievements(ctx).await,
            Callback::Motivate => stats::handle_motivate(ctx).await,
        },
        Err(e) => Err(e),
    };
    result.unwrap_or_else(|e| {
        error!("callback {callback:?} from {} failed: {e}", ctx.sender_id);
        Reply::text(format!("Error: {e}"))
    })
}
