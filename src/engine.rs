//! Progression engine.
//!
//! Turns task lifecycle events into XP, levels, streaks and badge unlocks.
//! The engine exclusively owns its [`ProgressionState`]; every mutation goes
//! through a `&mut self` method and is followed by a save to the
//! [`ProgressStore`].
//!
//! # Cascades
//!
//! Unlocking a badge awards XP, the XP can raise the level, and a new level
//! can unlock a level badge. Instead of recursing, each operation runs a
//! [`Pass`]: a FIFO work-list of badges waiting to be unlocked. A badge id
//! enters the queue at most once per pass and is never unlocked twice, so a
//! pass always terminates.

use std::collections::{BTreeMap, HashSet, VecDeque};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use crate::badge::{
    self, BadgeDefinition, BadgeRule, BadgeUnlock, Comparison, EventFacts, Facts, Trigger,
    CATALOG,
};
use crate::clock::Clock;
use crate::config::StatsConfig;
use crate::error::{Error, Result};
use crate::level::{level_for_xp, XpProgress, BASE_TASK_XP};
use crate::state::{DayCount, ProgressionState};
use crate::storage::ProgressStore;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceReason {
    Import,
    Reset,
}

/// Something observers should hear about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    BadgeUnlocked(BadgeUnlock),
    LevelUp {
        #[serde(rename = "newLevel")]
        new_level: u32,
    },
    StateReplaced { reason: ReplaceReason },
}

/// Result of one engine operation.
///
/// A failed save does not undo the in-memory change; it is reported here and
/// the session carries on with the unsaved state.
#[derive(Debug, Default)]
pub struct Outcome {
    pub notifications: Vec<Notification>,
    pub persist_error: Option<Error>,
}

impl Outcome {
    pub fn unlocked(&self) -> impl Iterator<Item = &BadgeUnlock> {
        self.notifications.iter().filter_map(|note| match note {
            Notification::BadgeUnlocked(unlock) => Some(unlock),
            _ => None,
        })
    }

    pub fn unlocked_ids(&self) -> Vec<&str> {
        self.unlocked().map(|unlock| unlock.id.as_str()).collect()
    }

    pub fn level_ups(&self) -> Vec<u32> {
        self.notifications
            .iter()
            .filter_map(|note| match note {
                Notification::LevelUp { new_level } => Some(*new_level),
                _ => None,
            })
            .collect()
    }

    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// Read-only view for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub xp: u64,
    pub level: u32,
    pub streak: u32,
    pub total_tasks_completed: u64,
    pub badges: Vec<String>,
    pub weekly_stats: BTreeMap<NaiveDate, u32>,
    pub xp_progress: XpProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeStatus {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub xp_reward: u64,
    pub earned: bool,
}

/// Every catalog badge with its earned flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeBoard {
    pub earned: usize,
    pub total: usize,
    /// Rounded share of the catalog earned
    pub percentage: u32,
    pub badges: Vec<BadgeStatus>,
}

/// Work-list for one engine operation.
#[derive(Default)]
struct Pass {
    queue: VecDeque<&'static BadgeDefinition>,
    queued: HashSet<&'static str>,
    notifications: Vec<Notification>,
    changed: bool,
}

impl Pass {
    fn enqueue(&mut self, badge: &'static BadgeDefinition) {
        if self.queued.insert(badge.id) {
            self.queue.push_back(badge);
        }
    }
}

pub struct ProgressionEngine<S: ProgressStore> {
    state: ProgressionState,
    store: S,
    clock: Box<dyn Clock>,
    retention_days: u32,
}

impl<S: ProgressStore> ProgressionEngine<S> {
    /// Load state from `store`, falling back to a fresh record when it is
    /// missing or unreadable.
    pub fn open(store: S, clock: Box<dyn Clock>, stats: &StatsConfig) -> Self {
        let today = clock.today();
        let state = match store.load() {
            Ok(Some(raw)) => ProgressionState::from_value(&raw, today),
            Ok(None) => ProgressionState::empty(today),
            Err(err) => {
                tracing::warn!(error = %err, "could not load progression state, starting fresh");
                ProgressionState::empty(today)
            }
        };
        Self {
            state,
            store,
            clock,
            retention_days: stats.retention_days,
        }
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    /// Owned copy of the current state, e.g. for export.
    pub fn snapshot(&self) -> ProgressionState {
        self.state.clone()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// A task was added at `now`. Only addition-time badges can fire here.
    pub fn on_task_added(&mut self, task: &Task, now: NaiveDateTime) -> Outcome {
        let mut pass = Pass::default();
        let event = EventFacts {
            trigger: Trigger::Added,
            at: now,
            perfect_day: false,
        };
        self.evaluate(&mut pass, Some(event), Comparison::Exact, |rule| {
            matches!(
                rule,
                BadgeRule::TimeWindow {
                    trigger: Trigger::Added,
                    ..
                }
            )
        });
        tracing::debug!(task = %task.id, unlocked = pass.notifications.len(), "task added");
        self.finish(pass, false)
    }

    /// A task was completed at `now`. `todays_tasks` are the tasks created on
    /// `now`'s date, as known by the task list.
    pub fn on_task_completed(
        &mut self,
        task: &Task,
        now: NaiveDateTime,
        todays_tasks: &[Task],
    ) -> Outcome {
        let mut pass = Pass::default();
        let today = now.date();

        self.state.total_tasks_completed = self.state.total_tasks_completed.saturating_add(1);
        pass.changed = true;
        self.grant_xp(BASE_TASK_XP, &mut pass);
        self.update_streak(today, &mut pass);
        self.state.record_completion(today, self.retention_days);

        let perfect_day = !todays_tasks.is_empty()
            && todays_tasks
                .iter()
                .all(|other| other.completed || other.id == task.id);
        let event = EventFacts {
            trigger: Trigger::Completed,
            at: now,
            perfect_day,
        };
        // Catalog order gives firstTask, taskMaster, perfectDay, nightOwl.
        self.evaluate(&mut pass, Some(event), Comparison::Exact, |rule| {
            matches!(
                rule,
                BadgeRule::TasksCompleted(_)
                    | BadgeRule::PerfectDay
                    | BadgeRule::TimeWindow {
                        trigger: Trigger::Completed,
                        ..
                    }
            )
        });

        tracing::debug!(
            task = %task.id,
            total = self.state.total_tasks_completed,
            streak = self.state.streak,
            xp = self.state.xp,
            "task completed"
        );
        self.finish(pass, true)
    }

    // =========================================================================
    // Badges and XP
    // =========================================================================

    /// Unlock a badge by id. Unknown ids are logged and ignored; known ones
    /// unlock at most once.
    pub fn check_badge(&mut self, id: &str) -> Outcome {
        let mut pass = Pass::default();
        match badge::find(id) {
            Some(badge) => self.unlock(badge, &mut pass),
            None => tracing::warn!(badge = id, "unknown badge id"),
        }
        self.finish(pass, false)
    }

    /// Catch-up pass over state-derived badges (counts, streaks, levels).
    pub fn check_all_badges(&mut self) -> Outcome {
        let mut pass = Pass::default();
        self.evaluate(&mut pass, None, Comparison::AtLeast, BadgeRule::is_retroactive);
        if pass.changed {
            tracing::info!(
                unlocked = pass.notifications.len(),
                "catch-up pass repaired badges"
            );
        }
        self.finish(pass, false)
    }

    /// Award XP outside of a task event.
    pub fn add_xp(&mut self, amount: u64) -> Outcome {
        let mut pass = Pass::default();
        self.grant_xp(amount, &mut pass);
        self.finish(pass, false)
    }

    // =========================================================================
    // Import / reset
    // =========================================================================

    /// Replace the whole state with `snapshot`, defaulting bad fields.
    pub fn import_state(&mut self, snapshot: &Value) -> Outcome {
        self.state = ProgressionState::from_value(snapshot, self.clock.today());
        tracing::info!(xp = self.state.xp, badges = self.state.badges.len(), "progression imported");
        self.replaced(ReplaceReason::Import)
    }

    pub fn reset(&mut self) -> Outcome {
        self.state = ProgressionState::empty(self.clock.today());
        tracing::info!("progression reset");
        self.replaced(ReplaceReason::Reset)
    }

    fn replaced(&mut self, reason: ReplaceReason) -> Outcome {
        let pass = Pass {
            notifications: vec![Notification::StateReplaced { reason }],
            changed: true,
            ..Pass::default()
        };
        self.finish(pass, true)
    }

    // =========================================================================
    // Read-only views
    // =========================================================================

    pub fn stats(&self) -> Stats {
        Stats {
            xp: self.state.xp,
            level: self.state.level,
            streak: self.state.streak,
            total_tasks_completed: self.state.total_tasks_completed,
            badges: self.state.badges.clone(),
            weekly_stats: self.state.weekly_stats.clone(),
            xp_progress: XpProgress::for_xp(self.state.xp),
        }
    }

    /// Last seven days of completions, oldest first.
    pub fn weekly_series(&self) -> Vec<DayCount> {
        self.state.weekly_series(self.clock.today())
    }

    pub fn badge_board(&self) -> BadgeBoard {
        let badges: Vec<BadgeStatus> = CATALOG
            .iter()
            .map(|badge| BadgeStatus {
                id: badge.id,
                name: badge.name,
                description: badge.description,
                icon: badge.icon,
                xp_reward: badge.xp_reward,
                earned: self.state.has_badge(badge.id),
            })
            .collect();
        let earned = badges.iter().filter(|status| status.earned).count();
        let total = badges.len();
        let percentage = (earned as f64 / total as f64 * 100.0).round() as u32;
        BadgeBoard {
            earned,
            total,
            percentage,
            badges,
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn facts(&self, event: Option<EventFacts>) -> Facts {
        Facts {
            total_tasks_completed: self.state.total_tasks_completed,
            streak: self.state.streak,
            level: self.state.level,
            event,
        }
    }

    /// Unlock every not-yet-earned badge of one rule family whose rule holds.
    fn evaluate<F>(
        &mut self,
        pass: &mut Pass,
        event: Option<EventFacts>,
        comparison: Comparison,
        family: F,
    ) where
        F: Fn(&BadgeRule) -> bool,
    {
        for badge in badge::matching(family) {
            if self.state.has_badge(badge.id) {
                continue;
            }
            // Facts are rebuilt per badge: an earlier unlock may have moved the level.
            let facts = self.facts(event);
            if badge.rule.is_met(&facts, comparison) {
                self.unlock(badge, pass);
            }
        }
    }

    fn unlock(&mut self, badge: &'static BadgeDefinition, pass: &mut Pass) {
        pass.enqueue(badge);
        self.drain(pass);
    }

    fn drain(&mut self, pass: &mut Pass) {
        while let Some(badge) = pass.queue.pop_front() {
            if self.state.has_badge(badge.id) {
                continue;
            }
            self.state.badges.push(badge.id.to_string());
            pass.changed = true;
            tracing::info!(badge = badge.id, reward = badge.xp_reward, "badge unlocked");
            pass.notifications
                .push(Notification::BadgeUnlocked(BadgeUnlock::from(badge)));
            self.award_xp(badge.xp_reward, pass);
        }
    }

    fn grant_xp(&mut self, amount: u64, pass: &mut Pass) {
        self.award_xp(amount, pass);
        self.drain(pass);
    }

    /// Add XP and queue any level badge the new level has reached.
    fn award_xp(&mut self, amount: u64, pass: &mut Pass) {
        if amount == 0 {
            return;
        }
        let previous = self.state.level;
        self.state.xp = self.state.xp.saturating_add(amount);
        pass.changed = true;

        let level = level_for_xp(self.state.xp);
        if level <= previous {
            return;
        }
        self.state.level = level;
        tracing::info!(level, xp = self.state.xp, "level up");
        pass.notifications
            .push(Notification::LevelUp { new_level: level });

        let facts = self.facts(None);
        for badge in badge::matching(|rule| matches!(rule, BadgeRule::Level(_))) {
            if !self.state.has_badge(badge.id) && badge.rule.is_met(&facts, Comparison::AtLeast) {
                pass.enqueue(badge);
            }
        }
    }

    fn update_streak(&mut self, today: NaiveDate, pass: &mut Pass) {
        match self.state.last_completed_date {
            Some(last) if last == today => return,
            Some(last) if last.succ_opt() == Some(today) => {
                self.state.streak = self.state.streak.saturating_add(1);
            }
            _ => self.state.streak = 1,
        }
        self.state.last_completed_date = Some(today);
        pass.changed = true;

        self.evaluate(pass, None, Comparison::Exact, |rule| {
            matches!(rule, BadgeRule::Streak(_))
        });
    }

    /// Save when asked to or when the pass changed anything.
    fn finish(&mut self, pass: Pass, always_persist: bool) -> Outcome {
        let mut outcome = Outcome {
            notifications: pass.notifications,
            persist_error: None,
        };
        if always_persist || pass.changed {
            if let Err(err) = self.persist() {
                outcome.persist_error = Some(err);
            }
        }
        outcome
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&self.state).map_err(|err| {
            tracing::warn!(error = %err, "could not save progression state");
            err
        })
    }
}
