//! Badge catalog and unlock rules.
//!
//! Every badge is a static [`BadgeDefinition`] whose unlock condition is a
//! [`BadgeRule`]. The engine never special-cases a badge by id; it walks the
//! catalog and asks each rule whether it holds for the facts at hand.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::Serialize;

/// Which task lifecycle event a time-window rule listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Added,
    Completed,
}

/// Time-of-day or day-of-week condition, checked against the event instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// Hour strictly below the bound
    HourBefore(u32),
    /// Hour at or above the bound
    HourFrom(u32),
    /// Saturday or Sunday
    Weekend,
}

impl TimeWindow {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        match *self {
            TimeWindow::HourBefore(bound) => at.hour() < bound,
            TimeWindow::HourFrom(bound) => at.hour() >= bound,
            TimeWindow::Weekend => matches!(at.weekday(), Weekday::Sat | Weekday::Sun),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeRule {
    TasksCompleted(u64),
    Streak(u32),
    Level(u32),
    /// Every task created today has been completed
    PerfectDay,
    TimeWindow { trigger: Trigger, window: TimeWindow },
}

/// How count and streak thresholds compare against state.
///
/// Live events compare exactly, since counters move one step at a time. The
/// catch-up pass compares with `>=` so it can repair restored state. Level
/// thresholds always use `>=` because a single reward can jump several levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Exact,
    AtLeast,
}

impl Comparison {
    fn holds<T: PartialOrd>(self, value: T, threshold: T) -> bool {
        match self {
            Comparison::Exact => value == threshold,
            Comparison::AtLeast => value >= threshold,
        }
    }
}

/// The instant-bound part of an event, for rules that only make sense live.
#[derive(Debug, Clone, Copy)]
pub struct EventFacts {
    pub trigger: Trigger,
    pub at: NaiveDateTime,
    pub perfect_day: bool,
}

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct Facts {
    pub total_tasks_completed: u64,
    pub streak: u32,
    pub level: u32,
    pub event: Option<EventFacts>,
}

impl BadgeRule {
    pub fn is_met(&self, facts: &Facts, comparison: Comparison) -> bool {
        match *self {
            BadgeRule::TasksCompleted(threshold) => {
                comparison.holds(facts.total_tasks_completed, threshold)
            }
            BadgeRule::Streak(threshold) => comparison.holds(facts.streak, threshold),
            BadgeRule::Level(threshold) => facts.level >= threshold,
            BadgeRule::PerfectDay => facts.event.is_some_and(|event| {
                event.trigger == Trigger::Completed && event.perfect_day
            }),
            BadgeRule::TimeWindow { trigger, window } => facts
                .event
                .is_some_and(|event| event.trigger == trigger && window.contains(event.at)),
        }
    }

    /// Rules that can be re-derived from stored state alone.
    pub fn is_retroactive(&self) -> bool {
        matches!(
            self,
            BadgeRule::TasksCompleted(_) | BadgeRule::Streak(_) | BadgeRule::Level(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Icon reference handed to renderers (Font Awesome class)
    pub icon: &'static str,
    pub xp_reward: u64,
    pub rule: BadgeRule,
}

pub static CATALOG: &[BadgeDefinition] = &[
    BadgeDefinition {
        id: "firstTask",
        name: "First Steps",
        description: "Complete your first task",
        icon: "fas fa-star",
        xp_reward: 10,
        rule: BadgeRule::TasksCompleted(1),
    },
    BadgeDefinition {
        id: "taskMaster",
        name: "Task Master",
        description: "Complete 10 tasks",
        icon: "fas fa-crown",
        xp_reward: 50,
        rule: BadgeRule::TasksCompleted(10),
    },
    BadgeDefinition {
        id: "streak3",
        name: "On Fire",
        description: "3-day streak",
        icon: "fas fa-fire",
        xp_reward: 25,
        rule: BadgeRule::Streak(3),
    },
    BadgeDefinition {
        id: "streak7",
        name: "Week Warrior",
        description: "7-day streak",
        icon: "fas fa-calendar-week",
        xp_reward: 100,
        rule: BadgeRule::Streak(7),
    },
    BadgeDefinition {
        id: "streak30",
        name: "Consistency King",
        description: "30-day streak",
        icon: "fas fa-calendar-alt",
        xp_reward: 500,
        rule: BadgeRule::Streak(30),
    },
    BadgeDefinition {
        id: "level5",
        name: "Rising Star",
        description: "Reach level 5",
        icon: "fas fa-rocket",
        xp_reward: 200,
        rule: BadgeRule::Level(5),
    },
    BadgeDefinition {
        id: "level10",
        name: "Veteran",
        description: "Reach level 10",
        icon: "fas fa-medal",
        xp_reward: 500,
        rule: BadgeRule::Level(10),
    },
    BadgeDefinition {
        id: "level20",
        name: "Legend",
        description: "Reach level 20",
        icon: "fas fa-trophy",
        xp_reward: 1000,
        rule: BadgeRule::Level(20),
    },
    BadgeDefinition {
        id: "perfectDay",
        name: "Perfect Day",
        description: "Complete all tasks in a day",
        icon: "fas fa-sun",
        xp_reward: 75,
        rule: BadgeRule::PerfectDay,
    },
    BadgeDefinition {
        id: "earlyBird",
        name: "Early Bird",
        description: "Add a task before 9 AM",
        icon: "fas fa-clock",
        xp_reward: 30,
        rule: BadgeRule::TimeWindow {
            trigger: Trigger::Added,
            window: TimeWindow::HourBefore(9),
        },
    },
    BadgeDefinition {
        id: "nightOwl",
        name: "Night Owl",
        description: "Complete a task after 10 PM",
        icon: "fas fa-moon",
        xp_reward: 30,
        rule: BadgeRule::TimeWindow {
            trigger: Trigger::Completed,
            window: TimeWindow::HourFrom(22),
        },
    },
    BadgeDefinition {
        id: "weekendWarrior",
        name: "Weekend Warrior",
        description: "Add tasks on weekends",
        icon: "fas fa-calendar-day",
        xp_reward: 40,
        rule: BadgeRule::TimeWindow {
            trigger: Trigger::Added,
            window: TimeWindow::Weekend,
        },
    },
];

/// Look up a badge by id.
pub fn find(id: &str) -> Option<&'static BadgeDefinition> {
    CATALOG.iter().find(|badge| badge.id == id)
}

/// Badges of one rule family, in catalog order.
pub fn matching<F>(filter: F) -> impl Iterator<Item = &'static BadgeDefinition>
where
    F: Fn(&BadgeRule) -> bool,
{
    CATALOG.iter().filter(move |badge| filter(&badge.rule))
}

/// Payload of a badge-unlock notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeUnlock {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub xp_reward: u64,
}

impl From<&BadgeDefinition> for BadgeUnlock {
    fn from(badge: &BadgeDefinition) -> Self {
        Self {
            id: badge.id.to_string(),
            name: badge.name.to_string(),
            description: badge.description.to_string(),
            icon: badge.icon.to_string(),
            xp_reward: badge.xp_reward,
        }
    }
}
