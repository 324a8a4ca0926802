//! Message templates for reminders, confirmations, milestones, and summaries.
//!
//! Pure: every function maps numbers to text. Picking among variants and
//! logging what was sent is [`crate::motivation`]'s job.

use crate::progress::{percent, ProgressBand, BAR_BLOCKS};

/// Regular reminder variants.
pub fn water_reminders(session_ml: i64) -> Vec<String> {
    vec![
        format!("💧 *Time for water!* Drink {session_ml} ml now. Your body will thank you! ✨"),
        format!("🚰 *Water break!* {session_ml} ml keeps your energy and focus up all day. 🌟"),
        "💦 *A sip of health!* Water speeds up your metabolism and sharpens your mind. 🧠"
            .to_string(),
        format!(
            "🌊 *Hydration pause!* {session_ml} ml = more energy, better skin, happier organs. 💫"
        ),
    ]
}

/// Follow-up variants for a reminder nobody answered.
pub fn follow_ups(session_ml: i64, delay_minutes: u32) -> Vec<String> {
    vec![
        format!(
            "⏰ *Still thirsty?* {delay_minutes} minutes have passed. Don't skip your {session_ml} ml! 💧"
        ),
        format!("💡 *Forgot about water?* Just {session_ml} ml keeps you sharp and feeling good. 🌟"),
    ]
}

/// First reminder of the day.
pub fn morning(session_ml: i64) -> String {
    format!(
        "🌅 *Good morning!* Start the day with {session_ml} ml of water. It wakes up your metabolism. 💫"
    )
}

/// Reply to a logged intake, worded by how far along the day is.
pub fn intake_confirmation(volume_ml: i64, current_ml: i64, goal_ml: i64) -> String {
    let pct = percent(current_ml, goal_ml);
    if pct <= 25.0 {
        format!(
            "✅ *Nice!* {volume_ml} ml logged. Today: {current_ml}/{goal_ml} ml\n*Keep it up!* 💪"
        )
    } else if pct <= 50.0 {
        format!(
            "🎉 *Great!* Another {volume_ml} ml. Today: {current_ml}/{goal_ml} ml\n*You're on your way!* 🌟"
        )
    } else if pct <= 75.0 {
        format!("🔥 *Excellent!* {current_ml} ml already! Your cells are dancing. 💃")
    } else {
        format!("💎 *Perfect!* {current_ml} ml done! The finish line is in sight. ✨")
    }
}

/// Milestone announcement, for the percentages in [`crate::progress::MILESTONES`].
pub fn milestone(pct: u32, current_ml: i64, goal_ml: i64) -> Option<String> {
    let left = (goal_ml - current_ml).max(0);
    match pct {
        50 => Some(format!(
            "🏆 *50% done!* Halfway to {goal_ml} ml. Only {left} ml to go! 🚀"
        )),
        75 => Some(format!(
            "⭐ *75% done!* Just {left} ml until full victory! 💫"
        )),
        95 => Some(format!(
            "🎊 *95% reached!* One more sip and the day is yours! 🌈"
        )),
        _ => None,
    }
}

pub fn goal_achieved(goal_ml: i64) -> String {
    format!(
        "🌈 *VICTORY!* You reached today's goal of {goal_ml} ml! 🎉\n\
         *Your body thanks you for:*\n\
         • 💆 Hydrated skin\n\
         • 🧠 Clear thinking\n\
         • 💪 Energy all day\n\
         • 🏃 A faster metabolism\n\
         *Be proud! Same again tomorrow.* ✨"
    )
}

/// End-of-day recap.
pub fn evening_summary(current_ml: i64, goal_ml: i64) -> String {
    let pct = percent(current_ml, goal_ml);
    let phrase = if pct >= 100.0 {
        "Great work! You're on the right track. 🌟"
    } else if pct >= 75.0 {
        "Good result! Tomorrow will be even better. 💪"
    } else if pct >= 50.0 {
        "Not bad! Try a little more water tomorrow. 🌱"
    } else {
        "Don't worry! Every day is a new chance. 🌈"
    };
    format!("📊 *Today's recap:* you drank {current_ml}/{goal_ml} ml! {phrase}")
}

pub const SPECIALS: &[&str] = &[
    "💝 *Love yourself!* Every sip of water is care for your health and looks. ✨",
    "🎯 *Discipline is freedom!* Drinking regularly fuels everything you want to do. 🚀",
    "🌿 *Nature approves!* Water helps your body work in harmony. 💚",
];

pub const FACTS: &[&str] = &[
    "🔬 *Did you know?* Losing just 2% of body water can cut concentration noticeably. 🧠",
    "🧪 *Fun fact!* Water makes up about 60% of an adult's body weight. ⚖️",
    "🔍 *Science says:* a glass of water on an empty stomach helps kick-start the day. 🚀",
];

/// Motivational sentence for a progress band.
pub fn summary(band: ProgressBand, remaining_ml: i64) -> String {
    match band {
        ProgressBand::GoalAchieved => {
            "🎉 *Congratulations!* You reached today's goal! ✨".to_string()
        }
        ProgressBand::AlmostThere => {
            format!("🔥 *Great!* Final stretch, only {remaining_ml} ml left! 💪")
        }
        ProgressBand::Halfway => {
            "⚡ *Good job!* You're past the halfway mark. Keep going! 🌟".to_string()
        }
        ProgressBand::GettingStarted => {
            "🌱 *Off you go!* Every sip brings you closer. Don't stop! 💧".to_string()
        }
        ProgressBand::JustStarted => {
            "💧 *Time to start!* Your body is waiting for its first glass. 🚀".to_string()
        }
    }
}

/// `[💧💧💧⚪…] 30% (600/2000 ml)`
pub fn progress_bar(current_ml: i64, goal_ml: i64) -> String {
    let pct = percent(current_ml, goal_ml);
    let filled = ((pct / 10.0).floor() as usize).min(BAR_BLOCKS as usize);
    format!(
        "[{}{}] {:.0}% ({current_ml}/{goal_ml} ml)",
        "💧".repeat(filled),
        "⚪".repeat(BAR_BLOCKS as usize - filled),
        pct
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar() {
        assert_eq!(
            progress_bar(600, 2000),
            "[💧💧💧⚪⚪⚪⚪⚪⚪⚪] 30% (600/2000 ml)"
        );
        assert_eq!(progress_bar(0, 2000).matches('⚪').count(), 10);
        assert_eq!(progress_bar(9000, 2000).matches('💧').count(), 10);
    }

    #[test]
    fn test_templates_use_volumes() {
        assert!(water_reminders(300).iter().any(|m| m.contains("300 ml")));
        assert!(follow_ups(300, 5)[0].contains("5 minutes"));
        assert!(morning(250).contains("250 ml"));
        assert!(goal_achieved(2500).contains("2500 ml"));
    }

    #[test]
    fn test_intake_confirmation_bands() {
        assert!(intake_confirmation(250, 250, 2000).starts_with("✅"));
        assert!(intake_confirmation(250, 1000, 2000).starts_with("🎉"));
        assert!(intake_confirmation(250, 1500, 2000).starts_with("🔥"));
        assert!(intake_confirmation(250, 1750, 2000).starts_with("💎"));
    }

    #[test]
    fn test_milestones_known_only() {
        assert!(milestone(50, 1000, 2000).unwrap().contains("1000 ml to go"));
        assert!(milestone(75, 1500, 2000).is_some());
        assert!(milestone(95, 1900, 2000).is_some());
        assert!(milestone(60, 1200, 2000).is_none());
    }

    #[test]
    fn test_evening_summary_phrases() {
        assert!(evening_summary(2000, 2000).contains("right track"));
        assert!(evening_summary(500, 2000).contains("new chance"));
    }

    #[test]
    fn test_summary_mentions_remaining() {
        assert!(summary(ProgressBand::AlmostThere, 400).contains("400 ml"));
    }
}
