//! Progress engine: daily and weekly aggregates, status bands, milestones,
//! and goal streaks. Read-only over the intake ledger.


use crate::content;
use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use hydro_core::{
    config::ReminderConfig,
    error::HydroError,
    models::{IntakeRecord, User},
    schedule::{next_slot_after, window_slots},
};
use hydro_memory::Store;

/// Percentages at which a one-off milestone message is sent.
pub const MILESTONES: [u32; 3] = [50, 75, 95];

/// Days looked back when counting a streak.
const STREAK_LOOKBACK_DAYS: u32 = 366;

/// Blocks in a text progress bar.
pub const BAR_BLOCKS: u32 = 10;

/// Coarse progress band for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressBand {
    GoalAchieved,
    AlmostThere,
    Halfway,
    GettingStarted,
    JustStarted,
}

impl ProgressBand {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 100.0 {
            Self::GoalAchieved
        } else if percentage >= 75.0 {
            Self::AlmostThere
        } else if percentage >= 50.0 {
            Self::Halfway
        } else if percentage >= 25.0 {
            Self::GettingStarted
        } else {
            Self::JustStarted
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoalAchieved => "goal_achieved",
            Self::AlmostThere => "almost_there",
            Self::Halfway => "halfway",
            Self::GettingStarted => "getting_started",
            Self::JustStarted => "just_started",
        }
    }

    /// Short human label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::GoalAchieved => "🎉 Goal achieved!",
            Self::AlmostThere => "🔥 Almost there!",
            Self::Halfway => "⚡ Halfway!",
            Self::GettingStarted => "🌱 Getting started!",
            Self::JustStarted => "💧 Just started!",
        }
    }
}

/// When the user hears from us next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextReminder {
    Today(NaiveTime),
    /// No slots left today; first slot tomorrow.
    Tomorrow(NaiveTime),
    /// Notifications are disabled.
    Off,
}

/// One day's progress.
#[derive(Debug, Clone)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub current_ml: i64,
    pub goal_ml: i64,
    /// `current / goal * 100`, capped at 100.
    pub percentage: f64,
    pub band: ProgressBand,
    pub intake_count: usize,
    /// Mean volume per intake; 0 when there were none.
    pub avg_per_intake_ml: f64,
    /// The day's intakes, oldest first.
    pub intakes: Vec<IntakeRecord>,
    pub next_reminder: NextReminder,
}

impl DailyStats {
    /// Volume still missing to reach the goal.
    pub fn remaining_ml(&self) -> i64 {
        (self.goal_ml - self.current_ml).max(0)
    }
}

/// A day and how much was logged on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub total_ml: i64,
}

/// One bar of the weekly chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartBar {
    pub weekday: Weekday,
    pub total_ml: i64,
    pub percentage: f64,
    /// Filled blocks out of [`BAR_BLOCKS`].
    pub filled: u32,
}

/// Trailing 7-day progress.
#[derive(Debug, Clone)]
pub struct WeeklyStats {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub goal_ml: i64,
    /// Every day of the window, oldest first, zeros included.
    pub days: Vec<DayTotal>,
    pub total_ml: i64,
    /// Total over seven days, not over days with data.
    pub avg_daily_ml: f64,
    /// Share of `goal * 7`, capped at 100.
    pub percentage: f64,
    pub days_with_data: usize,
    pub best_day: Option<DayTotal>,
    pub worst_day: Option<DayTotal>,
    /// Monday to Sunday.
    pub chart: Vec<ChartBar>,
}

impl WeeklyStats {
    /// Render the chart as seven text lines, Monday first.
    pub fn render_chart(&self) -> String {
        self.chart
            .iter()
            .map(|bar| {
                format!(
                    "{}: {} {:.0}% ({} ml)",
                    weekday_short(bar.weekday),
                    block_bar(bar.filled),
                    bar.percentage,
                    bar.total_ml
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An unlocked achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    /// Goal met 7 days in a row.
    WeekStreak,
    /// Goal met 30 days in a row.
    MonthStreak,
    /// Goal met today.
    PerfectDay,
}

impl Badge {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::WeekStreak => "🏆",
            Self::MonthStreak => "👑",
            Self::PerfectDay => "💎",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::WeekStreak => "Week of discipline",
            Self::MonthStreak => "Month of mastery",
            Self::PerfectDay => "Perfect day",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::WeekStreak => "Reached your water goal 7 days in a row",
            Self::MonthStreak => "Reached your water goal 30 days in a row",
            Self::PerfectDay => "Reached 100% of your goal today",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Achievements {
    /// Consecutive days up to today with the goal met.
    pub streak_days: u32,
    pub badges: Vec<Badge>,
}

/// Computes derived statistics from the store.
#[derive(Clone)]
pub struct ProgressEngine {
    store: Store,
    reminders: ReminderConfig,
}

impl ProgressEngine {
    pub fn new(store: Store, reminders: ReminderConfig) -> Self {
        Self { store, reminders }
    }

    /// Progress for `date` (today when `None`). `None` for an unknown user.
    pub async fn daily_stats(
        &self,
        user_id: i64,
        date: Option<NaiveDate>,
    ) -> Result<Option<DailyStats>, HydroError> {
        let now = Local::now().naive_local();
        self.daily_stats_at(user_id, date.unwrap_or(now.date()), now)
            .await
    }

    /// Progress for `date`, with the next reminder computed as of `now`.
    pub async fn daily_stats_at(
        &self,
        user_id: i64,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Option<DailyStats>, HydroError> {
        let Some(user) = self.store.get_user(user_id).await? else {
            return Ok(None);
        };

        let intakes = self.store.intake_on(user_id, date).await?;
        let current_ml: i64 = intakes.iter().map(|i| i.volume_ml).sum();
        let percentage = percent(current_ml, user.daily_goal_ml);
        let intake_count = intakes.len();
        let avg_per_intake_ml = if intake_count == 0 {
            0.0
        } else {
            current_ml as f64 / intake_count as f64
        };

        Ok(Some(DailyStats {
            date,
            current_ml,
            goal_ml: user.daily_goal_ml,
            percentage,
            band: ProgressBand::from_percentage(percentage),
            intake_count,
            avg_per_intake_ml,
            intakes,
            next_reminder: self.next_reminder(&user, now.time()),
        }))
    }

    fn next_reminder(&self, user: &User, now: NaiveTime) -> NextReminder {
        if !user.notifications_enabled {
            return NextReminder::Off;
        }
        let window = Some((user.start_hour, user.end_hour));
        let Ok(slots) = window_slots(window, &self.reminders) else {
            return NextReminder::Off;
        };
        match (next_slot_after(&slots, now), slots.first()) {
            (Some(slot), _) => NextReminder::Today(slot),
            (None, Some(first)) => NextReminder::Tomorrow(*first),
            (None, None) => NextReminder::Off,
        }
    }

    /// The trailing seven days ending today.
    pub async fn weekly_stats(&self, user_id: i64) -> Result<Option<WeeklyStats>, HydroError> {
        self.weekly_stats_at(user_id, Local::now().date_naive())
            .await
    }

    /// The seven days ending on `today`.
    pub async fn weekly_stats_at(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<Option<WeeklyStats>, HydroError> {
        let Some(user) = self.store.get_user(user_id).await? else {
            return Ok(None);
        };
        let goal_ml = user.daily_goal_ml;
        let from = today.checked_sub_days(Days::new(6)).unwrap_or(today);

        let logged = self.store.daily_totals(user_id, from, today).await?;
        let days: Vec<DayTotal> = from
            .iter_days()
            .take_while(|d| *d <= today)
            .map(|date| DayTotal {
                date,
                total_ml: logged
                    .iter()
                    .find(|(d, _)| *d == date)
                    .map_or(0, |(_, total)| *total),
            })
            .collect();

        let total_ml: i64 = days.iter().map(|d| d.total_ml).sum();
        let with_data: Vec<DayTotal> = days.iter().copied().filter(|d| d.total_ml > 0).collect();

        let mut chart: Vec<ChartBar> = days
            .iter()
            .map(|d| {
                let percentage = percent(d.total_ml, goal_ml);
                ChartBar {
                    weekday: d.date.weekday(),
                    total_ml: d.total_ml,
                    percentage,
                    filled: filled_blocks(percentage),
                }
            })
            .collect();
        chart.sort_by_key(|bar| bar.weekday.num_days_from_monday());

        Ok(Some(WeeklyStats {
            from,
            to: today,
            goal_ml,
            total_ml,
            avg_daily_ml: total_ml as f64 / 7.0,
            percentage: percent(total_ml, goal_ml.saturating_mul(7)),
            days_with_data: with_data.len(),
            best_day: with_data.iter().copied().max_by_key(|d| d.total_ml),
            worst_day: with_data.iter().copied().min_by_key(|d| d.total_ml),
            days,
            chart,
        }))
    }

    /// Current streak and unlocked badges.
    pub async fn achievements(&self, user_id: i64) -> Result<Option<Achievements>, HydroError> {
        self.achievements_at(user_id, Local::now().date_naive())
            .await
    }

    pub async fn achievements_at(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<Option<Achievements>, HydroError> {
        let Some(user) = self.store.get_user(user_id).await? else {
            return Ok(None);
        };
        let streak_days = self.streak_at(user_id, user.daily_goal_ml, today).await?;

        let mut badges = Vec::new();
        if streak_days >= 7 {
            badges.push(Badge::WeekStreak);
        }
        if streak_days >= 30 {
            badges.push(Badge::MonthStreak);
        }
        // A streak of at least one day means today's goal is met.
        if streak_days >= 1 {
            badges.push(Badge::PerfectDay);
        }

        Ok(Some(Achievements {
            streak_days,
            badges,
        }))
    }

    /// Consecutive days ending on `today` with `goal_ml` reached.
    pub async fn streak_at(
        &self,
        user_id: i64,
        goal_ml: i64,
        today: NaiveDate,
    ) -> Result<u32, HydroError> {
        let mut streak = 0;
        let mut day = today;
        while streak < STREAK_LOOKBACK_DAYS {
            if self.store.daily_total(user_id, day).await? < goal_ml {
                break;
            }
            streak += 1;
            let Some(previous) = day.pred_opt() else {
                break;
            };
            day = previous;
        }
        Ok(streak)
    }
}

/// `current / goal * 100`, clamped to `[0, 100]`.
pub fn percent(current_ml: i64, goal_ml: i64) -> f64 {
    if goal_ml <= 0 {
        return 0.0;
    }
    (current_ml as f64 / goal_ml as f64 * 100.0).clamp(0.0, 100.0)
}

/// Milestones passed when the day's total went from `previous_ml` to `current_ml`.
pub fn crossed_milestones(previous_ml: i64, current_ml: i64, goal_ml: i64) -> Vec<u32> {
    let before = percent(previous_ml, goal_ml);
    let after = percent(current_ml, goal_ml);
    MILESTONES
        .iter()
        .copied()
        .filter(|m| before < f64::from(*m) && after >= f64::from(*m))
        .collect()
}

/// One motivational sentence for the day's band.
pub fn summary_line(stats: &DailyStats) -> String {
    content::summary(stats.band, stats.remaining_ml())
}

fn filled_blocks(percentage: f64) -> u32 {
    ((percentage / 10.0).floor() as u32).min(BAR_BLOCKS)
}

fn block_bar(filled: u32) -> String {
    let filled = filled.min(BAR_BLOCKS) as usize;
    format!(
        "{}{}",
        "█".repeat(filled),
        "░".repeat(BAR_BLOCKS as usize - filled)
    )
}

fn weekday_short(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}
