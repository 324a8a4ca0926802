//! Read-only command handlers: /stats, /week, /achievements, /schedule,
//! /motivate, /fact, /help.

use super::{menu_controls, CommandContext, Reply};
use crate::content::progress_bar;
use crate::progress::{summary_line, NextReminder};
use hydro_core::{error::HydroError, models::ReminderStatus};

fn unknown_user() -> Reply {
    Reply::text("Send /start first.")
}

pub(super) async fn handle_stats(ctx: &CommandContext<'_>) -> Result<Reply, HydroError> {
    let Some(stats) = ctx
        .progress
        .daily_stats_at(ctx.sender_id, ctx.now.date(), ctx.now)
        .await?
    else {
        return Ok(unknown_user());
    };

    let next = match stats.next_reminder {
        NextReminder::Today(t) => format!("today at {}", t.format("%H:%M")),
        NextReminder::Tomorrow(t) => format!("tomorrow at {}", t.format("%H:%M")),
        NextReminder::Off => "off (/notify on)".to_string(),
    };
    let text = format!(
        "📊 *Today:* {}\n\n{}\n\nGlasses: {} (avg {:.0} ml)\nNext reminder: {next}\n\n{}",
        stats.band.label(),
        progress_bar(stats.current_ml, stats.goal_ml),
        stats.intake_count,
        stats.avg_per_intake_ml,
        summary_line(&stats),
    );
    Ok(Reply::text(text).with_controls(menu_controls(ctx.reminders.water_per_session_ml)))
}

pub(super) async fn handle_week(ctx: &CommandContext<'_>) -> Result<Reply, HydroError> {
    let Some(week) = ctx
        .progress
        .weekly_stats_at(ctx.sender_id, ctx.now.date())
        .await?
    else {
        return Ok(unknown_user());
    };

    let mut out = format!(
        "📅 *Last 7 days* ({} to {})\n\n{}\n\nTotal: {} ml ({:.0}% of {} ml)\nDaily average: {:.0} ml\nDays with data: {}/7",
        week.from.format("%d.%m"),
        week.to.format("%d.%m"),
        week.render_chart(),
        week.total_ml,
        week.percentage,
        week.goal_ml * 7,
        week.avg_daily_ml,
        week.days_with_data,
    );
    if let (Some(best), Some(worst)) = (week.best_day, week.worst_day) {
        out.push_str(&format!(
            "\nBest day: {} ({} ml)\nWorst day: {} ({} ml)",
            best.date.format("%a %d.%m"),
            best.total_ml,
            worst.date.format("%a %d.%m"),
            worst.total_ml
        ));
    }
    Ok(Reply::text(out))
}

pub(super) async fn handle_achievements(ctx: &CommandContext<'_>) -> Result<Reply, HydroError> {
    let Some(achievements) = ctx
        .progress
        .achievements_at(ctx.sender_id, ctx.now.date())
        .await?
    else {
        return Ok(unknown_user());
    };

    let mut out = format!(
        "🏅 *Achievements*\n\nCurrent streak: {} day(s)",
        achievements.streak_days
    );
    if achievements.badges.is_empty() {
        out.push_str("\n\nNo badges yet. Reach your goal today to earn the first one!");
    } else {
        for badge in &achievements.badges {
            out.push_str(&format!(
                "\n\n{} *{}*\n{}",
                badge.icon(),
                badge.name(),
                badge.description()
            ));
        }
    }
    Ok(Reply::text(out))
}

pub(super) async fn handle_schedule(ctx: &CommandContext<'_>) -> Result<Reply, HydroError> {
    let slots = ctx.scheduler.user_reminder_schedule(ctx.sender_id).await?;
    let today = ctx
        .store
        .reminders_on(ctx.sender_id, ctx.now.date())
        .await?;
    let enabled = ctx
        .store
        .notifications_enabled(ctx.sender_id)
        .await?
        .unwrap_or(false);

    let mut out = String::from("🗓 *Reminder times:*\n");
    for slot in &slots {
        let mark = today
            .iter()
            .find(|r| r.scheduled_at.time() == *slot && r.parent_id.is_none())
            .map_or("", |r| match r.status {
                ReminderStatus::Pending => "",
                ReminderStatus::Completed => " ✅",
                ReminderStatus::Skipped => " ⏭",
            });
        out.push_str(&format!("\n{}{mark}", slot.format("%H:%M")));
    }
    if !enabled {
        out.push_str("\n\nReminders are off. Turn them on with /notify on.");
    }
    Ok(Reply::text(out))
}

pub(super) async fn handle_motivate(ctx: &CommandContext<'_>) -> Result<Reply, HydroError> {
    let text = match ctx.motivation.special(ctx.sender_id, ctx.now).await? {
        Some(text) => text,
        None => ctx.motivation.random(ctx.sender_id, ctx.now).await?,
    };
    Ok(Reply::text(text))
}

pub(super) async fn handle_fact(ctx: &CommandContext<'_>) -> Result<Reply, HydroError> {
    Ok(Reply::text(
        ctx.motivation.fact(ctx.sender_id, ctx.now).await?,
    ))
}

pub(super) fn handle_help(ctx: &CommandContext<'_>) -> Reply {
    let text = "💧 *Hydro commands*\n\n\
        /start - register and schedule today's reminders\n\
        /drink [ml] - log water (default one glass)\n\
        /stats - today's progress\n\
        /week - the last 7 days\n\
        /achievements - streak and badges\n\
        /history - recent intake\n\
        /goal [ml] - show or set your daily goal\n\
        /hours [start end] - show or set reminder hours\n\
        /notify [on|off] - turn reminders on or off\n\
        /schedule - today's reminder times\n\
        /motivate - a bit of motivation\n\
        /fact - a hydration fact\n\
        /delete confirm - delete your account and data\n\
        /help - this message";
    Reply::text(text).with_controls(menu_controls(ctx.reminders.water_per_session_ml))
}
