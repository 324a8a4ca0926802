//! Settings command handlers: /start, /goal, /hours, /notify, /delete.

use super::{menu_controls, CommandContext, Reply};
use hydro_core::{config::validate_window, error::HydroError};
use tracing::info;

/// Accepted daily goal range, in ml.
const MIN_GOAL_ML: i64 = 500;
const MAX_GOAL_ML: i64 = 10_000;

pub(super) async fn handle_start(ctx: &CommandContext<'_>) -> Result<Reply, HydroError> {
    let created = ctx
        .store
        .ensure_user(ctx.sender_id, ctx.sender_name, ctx.reminders)
        .await?;
    let scheduled = ctx
        .scheduler
        .schedule_daily_reminders(ctx.sender_id)
        .await?
        .map_or(0, |r| r.len());
    if created {
        info!("new user {} registered", ctx.sender_id);
    }

    let Some(user) = ctx.store.get_user(ctx.sender_id).await? else {
        return Ok(Reply::text("Registration failed, please try /start again."));
    };
    let greeting = if created { "Welcome" } else { "Welcome back" };
    let name = ctx.sender_name.unwrap_or("friend");
    let text = format!(
        "💧 *{greeting}, {name}!*\n\n\
         I'll remind you to drink water between {:02}:00 and {:02}:00.\n\
         Daily goal: {} ml. Reminders left today: {scheduled}.\n\n\
         Tap a button after each glass, or use /drink. See /help for everything else.",
        user.start_hour, user.end_hour, user.daily_goal_ml,
    );
    Ok(Reply::text(text).with_controls(menu_controls(ctx.reminders.water_per_session_ml)))
}

pub(super) async fn handle_goal(ctx: &CommandContext<'_>) -> Result<Reply, HydroError> {
    let args = ctx.args();
    let Some(arg) = args.first() else {
        return Ok(match ctx.store.get_user(ctx.sender_id).await? {
            Some(user) => Reply::text(format!(
                "🎯 Your daily goal is {} ml. Change it with /goal <ml>.",
                user.daily_goal_ml
            )),
            None => Reply::text("Send /start first."),
        });
    };

    let goal: i64 = match arg.trim_end_matches("ml").parse() {
        Ok(g) if (MIN_GOAL_ML..=MAX_GOAL_ML).contains(&g) => g,
        _ => {
            return Ok(Reply::text(format!(
                "Usage: /goal <ml>, between {MIN_GOAL_ML} and {MAX_GOAL_ML}."
            )))
        }
    };
    if !ctx.store.update_goal(ctx.sender_id, goal).await? {
        return Ok(Reply::text("Send /start first."));
    }
    info!("user {} set goal to {goal} ml", ctx.sender_id);
    Ok(Reply::text(format!("🎯 Daily goal set to {goal} ml.")))
}

pub(super) async fn handle_hours(ctx: &CommandContext<'_>) -> Result<Reply, HydroError> {
    let args = ctx.args();
    if args.is_empty() {
        return Ok(match ctx.store.get_time_window(ctx.sender_id).await? {
            Some((start, end)) => Reply::text(format!(
                "🕗 Reminders run from {start:02}:00 to {end:02}:00. \
                 Change with /hours <start> <end>, e.g. /hours 9 21."
            )),
            None => Reply::text("Send /start first."),
        });
    }

    let parsed = match args.as_slice() {
        [start, end] => start.parse::<u32>().ok().zip(end.parse::<u32>().ok()),
        _ => None,
    };
    let Some((start, end)) = parsed else {
        return Ok(Reply::text("Usage: /hours <start> <end>, e.g. /hours 9 21"));
    };
    if let Err(e) = validate_window(start, end) {
        return Ok(Reply::text(format!("Invalid hours: {e}")));
    }

    if !ctx.store.set_time_window(ctx.sender_id, start, end).await? {
        return Ok(Reply::text("Send /start first."));
    }
    let scheduled = ctx
        .scheduler
        .schedule_daily_reminders(ctx.sender_id)
        .await?
        .map_or(0, |r| r.len());
    Ok(Reply::text(format!(
        "🕗 Reminders now run from {start:02}:00 to {end:02}:00 ({scheduled} scheduled today)."
    )))
}

pub(super) async fn handle_notify(ctx: &CommandContext<'_>) -> Result<Reply, HydroError> {
    let Some(current) = ctx.store.notifications_enabled(ctx.sender_id).await? else {
        return Ok(Reply::text("Send /start first."));
    };
    let enable = match ctx.args().first().map(|a| a.to_lowercase()).as_deref() {
        Some("on") => true,
        Some("off") => false,
        None => !current,
        Some(_) => return Ok(Reply::text("Usage: /notify [on|off]")),
    };

    ctx.store.set_notifications(ctx.sender_id, enable).await?;
    if enable {
        let scheduled = ctx
            .scheduler
            .schedule_daily_reminders(ctx.sender_id)
            .await?
            .map_or(0, |r| r.len());
        Ok(Reply::text(format!(
            "🔔 Reminders are on ({scheduled} scheduled today)."
        )))
    } else {
        ctx.scheduler.cancel_user_reminders(ctx.sender_id).await?;
        Ok(Reply::text("🔕 Reminders are off. Turn them back on with /notify on."))
    }
}

pub(super) async fn handle_delete(ctx: &CommandContext<'_>) -> Result<Reply, HydroError> {
    if ctx.args().first().copied() != Some("confirm") {
        return Ok(Reply::text(
            "⚠️ This deletes your settings and your whole history. \
             Send /delete confirm to continue.",
        ));
    }
    ctx.scheduler.cancel_user_reminders(ctx.sender_id).await?;
    if ctx.store.delete_user(ctx.sender_id).await? {
        info!("user {} deleted their account", ctx.sender_id);
        Ok(Reply::text("🗑 Your data is gone. Send /start to begin again."))
    } else {
        Ok(Reply::text("There is nothing to delete."))
    }
}
