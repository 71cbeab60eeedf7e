//! questlog progress commands: stats, badges, check.

use serde::Serialize;

use crate::engine::{BadgeBoard, BadgeStatus, Notification, Stats};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::state::DayCount;

use super::session::Session;
use super::task::day_count;
use super::GlobalOptions;

pub struct BadgesOptions {
    pub earned: bool,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsOutput {
    stats: Stats,
    weekly: Vec<DayCount>,
    badges_earned: usize,
    badges_total: usize,
}

#[derive(Serialize)]
struct CheckOutput {
    repaired: Vec<Notification>,
    stats: Stats,
}

pub fn run_stats(global: GlobalOptions) -> Result<()> {
    let session = Session::open(&global)?;
    let stats = session.engine.stats();
    let weekly = session.engine.weekly_series();
    let board = session.engine.badge_board();

    let mut human = HumanOutput::new(format!("Level {}", stats.level));
    human.push_summary(
        "XP",
        format!(
            "{} ({}/{} to next level, {:.0}%)",
            stats.xp,
            stats.xp_progress.current,
            stats.xp_progress.needed,
            stats.xp_progress.percentage
        ),
    );
    human.push_summary("Streak", day_count(stats.streak));
    human.push_summary("Completed", stats.total_tasks_completed.to_string());
    human.push_summary("Badges", format!("{}/{}", board.earned, board.total));
    for day in &weekly {
        human.push_detail(format!(
            "{} {:<3} {}",
            day.date.format("%a %m-%d"),
            day.completed,
            "#".repeat(day.completed.min(40) as usize)
        ));
    }
    session.annotate(&mut human, session.startup_notifications());

    let output = StatsOutput {
        stats,
        weekly,
        badges_earned: board.earned,
        badges_total: board.total,
    };
    emit_success(session.output_options(), "stats", &output, Some(&human))
}

pub fn run_badges(options: BadgesOptions) -> Result<()> {
    let session = Session::open(&options.global)?;
    let mut board = session.engine.badge_board();
    if options.earned {
        board.badges.retain(|badge| badge.earned);
    }

    let mut human = HumanOutput::new(format!(
        "Badges {}/{} ({}%)",
        board.earned, board.total, board.percentage
    ));
    for badge in &board.badges {
        human.push_detail(badge_line(badge));
    }
    if board.earned == 0 {
        human.push_next_step("questlog add <text>");
    }
    session.annotate(&mut human, session.startup_notifications());

    emit_success::<BadgeBoard>(session.output_options(), "badges", &board, Some(&human))
}

pub fn run_check(global: GlobalOptions) -> Result<()> {
    let session = Session::open(&global)?;
    let repaired = session.startup_notifications().to_vec();

    let header = if repaired.is_empty() {
        "Badges up to date".to_string()
    } else {
        "Badges repaired".to_string()
    };
    let mut human = HumanOutput::new(header);
    session.annotate(&mut human, &repaired);

    let output = CheckOutput {
        repaired,
        stats: session.engine.stats(),
    };
    emit_success(session.output_options(), "check", &output, Some(&human))
}

fn badge_line(badge: &BadgeStatus) -> String {
    let mark = if badge.earned { "x" } else { " " };
    format!(
        "[{mark}] {} ({}) +{} XP - {}",
        badge.name, badge.id, badge.xp_reward, badge.description
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badge_line_marks_earned() {
        let status = BadgeStatus {
            id: "streak3",
            name: "On Fire",
            description: "3-day streak",
            icon: "fas fa-fire",
            xp_reward: 25,
            earned: true,
        };
        assert_eq!(badge_line(&status), "[x] On Fire (streak3) +25 XP - 3-day streak");
    }
}
