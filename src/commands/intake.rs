//! Intake command handlers: /drink, /history, and the "later" button.

use super::{menu_controls, CommandContext, Reply};
use crate::progress::crossed_milestones;
use crate::scheduler::Snooze;
use hydro_core::error::HydroError;
use tracing::info;

/// Largest single intake accepted, in ml.
pub(super) const MAX_INTAKE_ML: i64 = 5000;

/// Entries shown by /history.
const HISTORY_LIMIT: u32 = 10;

pub(super) fn validate_volume(volume_ml: i64) -> Result<i64, String> {
    if volume_ml <= 0 || volume_ml > MAX_INTAKE_ML {
        return Err(format!(
            "Please log between 1 and {MAX_INTAKE_ML} ml (got {volume_ml})."
        ));
    }
    Ok(volume_ml)
}

/// Parse a `/drink` argument such as `300` or `300ml`.
pub(super) fn parse_volume(arg: &str) -> Result<i64, String> {
    let digits = arg.trim().trim_end_matches("ml").trim();
    let volume: i64 = digits
        .parse()
        .map_err(|_| format!("'{arg}' is not a volume. Usage: /drink [ml], e.g. /drink 300"))?;
    validate_volume(volume)
}

/// Log one intake and reply with the confirmation, new milestones, and the goal message.
pub(super) async fn handle_drink(
    ctx: &CommandContext<'_>,
    volume_ml: i64,
    reminder_id: Option<&str>,
) -> Result<Reply, HydroError> {
    let today = ctx.now.date();
    let Some(user) = ctx.store.get_user(ctx.sender_id).await? else {
        return Ok(Reply::text("Send /start first."));
    };
    let goal = user.daily_goal_ml;

    let previous = ctx.store.daily_total(ctx.sender_id, today).await?;
    // Only link reminders the user owns.
    let reminder_id = match reminder_id {
        Some(id) => ctx
            .store
            .get_reminder(id)
            .await?
            .filter(|r| r.user_id == ctx.sender_id)
            .map(|r| r.id),
        None => None,
    };
    ctx.store
        .add_intake(ctx.sender_id, volume_ml, reminder_id.as_deref(), ctx.now)
        .await?;
    if let Some(ref id) = reminder_id {
        ctx.scheduler.mark_completed(id).await?;
    }
    let current = previous + volume_ml;
    info!("user {} logged {volume_ml} ml ({current}/{goal})", ctx.sender_id);

    let mut parts = vec![
        ctx.motivation
            .intake_confirmation(ctx.sender_id, volume_ml, current, goal, ctx.now)
            .await?,
    ];
    for pct in crossed_milestones(previous, current, goal) {
        if let Some(text) = ctx
            .motivation
            .milestone(ctx.sender_id, pct, current, goal, ctx.now)
            .await?
        {
            parts.push(text);
        }
    }
    if previous < goal && current >= goal {
        parts.push(
            ctx.motivation
                .goal_achieved(ctx.sender_id, goal, ctx.now)
                .await?,
        );
    }
    parts.push(crate::content::progress_bar(current, goal));

    Ok(Reply::text(parts.join("\n\n")).with_controls(menu_controls(
        ctx.reminders.water_per_session_ml,
    )))
}

pub(super) async fn handle_history(ctx: &CommandContext<'_>) -> Result<Reply, HydroError> {
    let history = ctx
        .store
        .intake_history(ctx.sender_id, HISTORY_LIMIT)
        .await?;
    if history.is_empty() {
        return Ok(Reply::text("No water logged yet. Try /drink."));
    }
    let mut out = String::from("🕓 *Recent intake:*\n");
    for record in &history {
        out.push_str(&format!(
            "\n{}  {} ml",
            record.logged_at.format("%d.%m %H:%M"),
            record.volume_ml
        ));
    }
    Ok(Reply::text(out))
}

/// "Remind me later" on a reminder message.
pub(super) async fn handle_later(
    ctx: &CommandContext<'_>,
    reminder_id: &str,
) -> Result<Reply, HydroError> {
    let minutes = i64::from(ctx.reminders.postpone_minutes);
    let text = match ctx
        .scheduler
        .snooze(ctx.sender_id, reminder_id, minutes, ctx.now)
        .await?
    {
        Snooze::Postponed(at) => format!("⏰ Okay, I'll remind you at {}.", at.format("%H:%M")),
        Snooze::FollowUp(follow_up) => format!(
            "⏰ Okay, I'll remind you again at {}.",
            follow_up.scheduled_at.format("%H:%M")
        ),
        Snooze::Ignored => "This reminder can't be snoozed any more.".to_string(),
    };
    Ok(Reply::text(text))
}
