//! Persisted progression record.
//!
//! Decoding is deliberately lenient: snapshots come from older builds, hand
//! edited files and export documents, so each field falls back to its default
//! on its own instead of failing the whole record.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::level::level_for_xp;

/// Days seeded into a fresh `weeklyStats` map.
pub const WEEKLY_WINDOW_DAYS: u32 = 7;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionState {
    pub xp: u64,
    pub level: u32,
    pub streak: u32,
    pub last_completed_date: Option<NaiveDate>,
    pub badges: Vec<String>,
    pub total_tasks_completed: u64,
    pub weekly_stats: BTreeMap<NaiveDate, u32>,
}

impl ProgressionState {
    /// Fresh state for a first run on `today`.
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            xp: 0,
            level: 1,
            streak: 0,
            last_completed_date: None,
            badges: Vec::new(),
            total_tasks_completed: 0,
            weekly_stats: empty_weekly_stats(today),
        }
    }

    /// Decode a snapshot, defaulting every missing or malformed field.
    ///
    /// `level` is never trusted from the snapshot; it is derived from `xp`.
    pub fn from_value(value: &Value, today: NaiveDate) -> Self {
        let field = |name: &str| value.get(name);

        let xp = field("xp").and_then(as_count).unwrap_or(0);
        let level = level_for_xp(xp);
        if let Some(stored) = field("level").and_then(as_count) {
            if stored != u64::from(level) {
                tracing::debug!(stored, derived = level, "stored level disagrees with xp");
            }
        }

        let streak = field("streak")
            .and_then(as_count)
            .map(|value| u32::try_from(value).unwrap_or(u32::MAX))
            .unwrap_or(0);

        let last_completed_date = field("lastCompletedDate")
            .and_then(Value::as_str)
            .and_then(parse_date);

        let badges = field("badges")
            .and_then(Value::as_array)
            .map(|items| dedup_badges(items.iter().filter_map(Value::as_str)))
            .unwrap_or_default();

        let total_tasks_completed = field("totalTasksCompleted").and_then(as_count).unwrap_or(0);

        let weekly_stats = match field("weeklyStats").and_then(Value::as_object) {
            Some(map) => map
                .iter()
                .filter_map(|(key, count)| {
                    let date = parse_date(key)?;
                    let count = u32::try_from(as_count(count)?).unwrap_or(u32::MAX);
                    Some((date, count))
                })
                .collect(),
            None => empty_weekly_stats(today),
        };

        Self {
            xp,
            level,
            streak,
            last_completed_date,
            badges,
            total_tasks_completed,
            weekly_stats,
        }
    }

    pub fn has_badge(&self, id: &str) -> bool {
        self.badges.iter().any(|badge| badge == id)
    }

    /// Count one completion on `day` and drop entries that left the window.
    pub fn record_completion(&mut self, day: NaiveDate, retention_days: u32) {
        let count = self.weekly_stats.entry(day).or_insert(0);
        *count = count.saturating_add(1);
        let retention = i64::from(retention_days.max(WEEKLY_WINDOW_DAYS));
        // A window reaching past the calendar's start keeps everything.
        if let Some(oldest) = day.checked_sub_signed(Duration::days(retention - 1)) {
            self.weekly_stats.retain(|date, _| *date >= oldest);
        }
    }

    /// Completions per day for the seven days ending on `today`, oldest first.
    pub fn weekly_series(&self, today: NaiveDate) -> Vec<DayCount> {
        (0..i64::from(WEEKLY_WINDOW_DAYS))
            .rev()
            .map(|offset| {
                let date = today - Duration::days(offset);
                DayCount {
                    date,
                    completed: self.weekly_stats.get(&date).copied().unwrap_or(0),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub completed: u32,
}

/// Zero counts for the last seven days ending on `today`.
pub fn empty_weekly_stats(today: NaiveDate) -> BTreeMap<NaiveDate, u32> {
    (0..i64::from(WEEKLY_WINDOW_DAYS))
        .map(|offset| (today - Duration::days(offset), 0))
        .collect()
}

/// Accepts `YYYY-MM-DD` or any ISO-8601 timestamp that starts with one.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).ok().or_else(|| {
        let date_part = trimmed.get(..10)?;
        NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
    })
}

fn as_count(value: &Value) -> Option<u64> {
    if let Some(count) = value.as_u64() {
        return Some(count);
    }
    match value.as_f64() {
        Some(float) if float.is_finite() && float >= 0.0 => Some(float.trunc() as u64),
        _ => None,
    }
}

fn dedup_badges<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}
