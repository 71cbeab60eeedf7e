use chrono::{Duration, NaiveDateTime};
use serde_json::json;

use questlog::clock::{parse_local, FixedClock};
use questlog::config::StatsConfig;
use questlog::engine::{Notification, ProgressionEngine, ReplaceReason};
use questlog::state::ProgressionState;
use questlog::storage::{MemoryStore, ProgressStore, Storage};
use questlog::task::Task;

fn at(raw: &str) -> NaiveDateTime {
    parse_local(raw).expect("timestamp")
}

fn engine<'a>(store: &'a MemoryStore, now: &str) -> ProgressionEngine<&'a MemoryStore> {
    ProgressionEngine::open(store, Box::new(FixedClock(at(now))), &StatsConfig::default())
}

fn complete_at(engine: &mut ProgressionEngine<&MemoryStore>, now: NaiveDateTime) {
    let task = Task::new("chore", now);
    engine.on_task_completed(&task, now, &[]);
}

#[test]
fn monday_morning_first_task() {
    let store = MemoryStore::new();
    let mut engine = engine(&store, "2026-03-02T08:00:00");
    let task = Task::new("write report", at("2026-03-02T08:00:00"));

    let added = engine.on_task_added(&task, at("2026-03-02T08:00:00"));
    assert_eq!(added.unlocked_ids(), vec!["earlyBird"]);

    let completed = engine.on_task_completed(&task, at("2026-03-02T08:00:00"), &[]);
    assert_eq!(completed.unlocked_ids(), vec!["firstTask"]);

    let state = engine.state();
    assert_eq!(state.total_tasks_completed, 1);
    assert_eq!(state.xp, 50);
    assert_eq!(state.level, 1);
    assert_eq!(state.streak, 1);
    assert!(state.has_badge("firstTask"));
    assert!(state.has_badge("earlyBird"));
    assert!(!state.has_badge("weekendWarrior"));
}

#[test]
fn weekend_addition_unlocks_once() {
    let store = MemoryStore::new();
    let mut engine = engine(&store, "2026-03-07T14:00:00");
    let saturday = at("2026-03-07T14:00:00");
    let sunday = at("2026-03-08T14:00:00");
    let first = engine.on_task_added(&Task::new("a", saturday), saturday);
    let second = engine.on_task_added(&Task::new("b", sunday), sunday);
    assert_eq!(first.unlocked_ids(), vec!["weekendWarrior"]);
    assert!(second.notifications.is_empty());
    assert_eq!(engine.state().xp, 40);
    assert_eq!(engine.state().total_tasks_completed, 0);
    assert_eq!(store.saves(), 1);
}

#[test]
fn check_badge_is_idempotent() {
    let store = MemoryStore::new();
    let mut engine = engine(&store, "2026-03-09T12:00:00");
    engine.check_badge("taskMaster");
    let again = engine.check_badge("taskMaster");
    assert!(again.notifications.is_empty());
    assert_eq!(engine.state().badges, vec!["taskMaster"]);
    assert_eq!(engine.state().xp, 50);
}

#[test]
fn consecutive_days_build_streak() {
    let store = MemoryStore::new();
    let mut engine = engine(&store, "2026-03-04T12:00:00");
    let start = at("2026-03-02T12:00:00");
    for offset in 0..3 {
        complete_at(&mut engine, start + Duration::days(offset));
    }
    assert_eq!(engine.state().streak, 3);
    assert!(engine.state().has_badge("streak3"));
}

#[test]
fn gap_resets_streak() {
    let store = MemoryStore::new();
    let mut engine = engine(&store, "2026-03-07T12:00:00");
    complete_at(&mut engine, at("2026-03-02T12:00:00"));
    complete_at(&mut engine, at("2026-03-07T12:00:00"));
    assert_eq!(engine.state().streak, 1);
    assert_eq!(
        engine.state().last_completed_date,
        Some(at("2026-03-07T00:00:00").date())
    );
}

#[test]
fn same_day_completions_count_but_keep_streak() {
    let store = MemoryStore::new();
    let mut engine = engine(&store, "2026-03-09T18:00:00");
    complete_at(&mut engine, at("2026-03-09T09:00:00"));
    complete_at(&mut engine, at("2026-03-09T18:00:00"));
    let state = engine.state();
    assert_eq!(state.total_tasks_completed, 2);
    assert_eq!(state.streak, 1);
    assert_eq!(state.weekly_stats.get(&at("2026-03-09T00:00:00").date()), Some(&2));
}

#[test]
fn clock_moving_backwards_restarts_streak() {
    let store = MemoryStore::with_record(json!({
        "streak": 5,
        "lastCompletedDate": "2026-03-10"
    }));
    let mut engine = engine(&store, "2026-03-09T12:00:00");
    complete_at(&mut engine, at("2026-03-09T12:00:00"));
    assert_eq!(engine.state().streak, 1);
}

#[test]
fn tenth_completion_unlocks_task_master() {
    let store = MemoryStore::new();
    let mut engine = engine(&store, "2026-03-09T12:00:00");
    for _ in 0..9 {
        complete_at(&mut engine, at("2026-03-09T12:00:00"));
    }
    assert!(!engine.state().has_badge("taskMaster"));
    let task = Task::new("tenth", at("2026-03-09T12:00:00"));
    let outcome = engine.on_task_completed(&task, at("2026-03-09T12:00:00"), &[]);
    assert_eq!(outcome.unlocked_ids(), vec!["taskMaster"]);
}

#[test]
fn level_skip_still_unlocks_level5() {
    let store = MemoryStore::new();
    let mut engine = engine(&store, "2026-03-09T12:00:00");
    engine.add_xp(900);
    assert_eq!(engine.state().level, 4);

    let outcome = engine.add_xp(1600);
    assert_eq!(outcome.level_ups(), vec![6]);
    assert_eq!(outcome.unlocked_ids(), vec!["level5"]);
    assert_eq!(engine.state().xp, 2700);
    assert_eq!(engine.state().level, 6);
}

#[test]
fn level_curve_points() {
    let store = MemoryStore::new();
    let mut engine = engine(&store, "2026-03-09T12:00:00");
    engine.add_xp(400);
    assert_eq!(engine.state().level, 3);
    engine.add_xp(1);
    assert_eq!(engine.state().level, 3);

    let outcome = engine.add_xp(1199);
    assert_eq!(outcome.unlocked_ids(), vec!["level5"]);
    assert_eq!(engine.state().xp, 1800);
    assert_eq!(engine.state().level, 5);

    let again = engine.check_all_badges();
    assert!(again.notifications.is_empty());
    assert_eq!(
        engine.state().badges.iter().filter(|id| *id == "level5").count(),
        1
    );
}

#[test]
fn catch_up_repairs_restored_state() {
    let store = MemoryStore::with_record(json!({
        "xp": 1700,
        "streak": 8,
        "totalTasksCompleted": 12,
        "badges": []
    }));
    let mut engine = engine(&store, "2026-03-09T12:00:00");
    let outcome = engine.check_all_badges();
    assert_eq!(
        outcome.unlocked_ids(),
        vec!["firstTask", "taskMaster", "streak3", "streak7", "level5"]
    );
    assert!(!engine.state().has_badge("streak30"));
    assert!(!engine.state().has_badge("earlyBird"));
    assert!(outcome.is_persisted());
}

#[test]
fn persist_failure_keeps_memory_state() {
    let store = MemoryStore::new();
    store.set_fail_writes(true);
    let mut engine = engine(&store, "2026-03-09T12:00:00");
    let task = Task::new("x", at("2026-03-09T12:00:00"));
    let outcome = engine.on_task_completed(&task, at("2026-03-09T12:00:00"), &[]);
    assert!(outcome.persist_error.is_some());
    assert_eq!(engine.state().total_tasks_completed, 1);
    assert_eq!(store.record(), None);

    store.set_fail_writes(false);
    let next = engine.on_task_completed(&task, at("2026-03-09T12:30:00"), &[]);
    assert!(next.is_persisted());
    assert_eq!(store.record().unwrap()["totalTasksCompleted"], 2);
}

#[test]
fn import_and_reset_notify_and_persist() {
    let store = MemoryStore::new();
    let mut engine = engine(&store, "2026-03-09T12:00:00");
    let imported = engine.import_state(&json!({
        "xp": 450,
        "level": 99,
        "badges": ["firstTask", "firstTask"],
        "weeklyStats": "garbage"
    }));
    assert_eq!(
        imported.notifications,
        vec![Notification::StateReplaced {
            reason: ReplaceReason::Import
        }]
    );
    assert_eq!(engine.state().level, 3);
    assert_eq!(engine.state().badges, vec!["firstTask"]);
    assert_eq!(engine.state().weekly_stats.len(), 7);
    assert_eq!(store.saves(), 1);

    let reset = engine.reset();
    assert_eq!(
        reset.notifications,
        vec![Notification::StateReplaced {
            reason: ReplaceReason::Reset
        }]
    );
    assert_eq!(engine.state().xp, 0);
    assert!(engine.state().badges.is_empty());
    assert_eq!(store.saves(), 2);
}

#[test]
fn import_does_not_evaluate_badges() {
    let store = MemoryStore::new();
    let mut engine = engine(&store, "2026-03-09T12:00:00");
    let outcome = engine.import_state(&json!({"totalTasksCompleted": 50, "badges": []}));
    assert_eq!(outcome.unlocked_ids(), Vec::<&str>::new());
    assert!(engine.state().badges.is_empty());
}

#[test]
fn snapshot_round_trips_through_file_store() {
    let temp = tempfile::tempdir().expect("tempdir");
    let storage = Storage::new(temp.path().to_path_buf());
    let clock = || Box::new(FixedClock(at("2026-03-09T23:30:00")));

    let mut engine = ProgressionEngine::open(storage.clone(), clock(), &StatsConfig::default());
    let task = Task::new("late", at("2026-03-09T23:00:00"));
    engine.on_task_completed(&task, at("2026-03-09T23:30:00"), &[task.clone()]);
    let before = engine.snapshot();

    let reloaded = ProgressionEngine::open(storage.clone(), clock(), &StatsConfig::default());
    assert_eq!(reloaded.snapshot(), before);

    let raw = storage.load().expect("load").expect("record");
    let mut other = ProgressionEngine::open(MemoryStore::new(), clock(), &StatsConfig::default());
    other.import_state(&raw);
    assert_eq!(other.snapshot(), before);
    assert_eq!(
        ProgressionState::from_value(&serde_json::to_value(&before).unwrap(), before.last_completed_date.unwrap()),
        before
    );
}

#[test]
fn maximal_xp_keeps_views_and_events_working() {
    let store = MemoryStore::new();
    let mut engine = engine(&store, "2026-03-09T12:00:00");
    engine.import_state(&json!({"xp": u64::MAX, "totalTasksCompleted": u64::MAX}));

    let stats = engine.stats();
    assert_eq!(stats.xp, u64::MAX);
    assert!(stats.xp_progress.needed >= 1);
    assert!(stats.xp_progress.percentage <= 100.0);

    complete_at(&mut engine, at("2026-03-09T12:00:00"));
    assert_eq!(engine.state().xp, u64::MAX);
    assert_eq!(engine.state().total_tasks_completed, u64::MAX);
    engine.stats();
}

#[test]
fn oversized_retention_does_not_break_completion() {
    let store = MemoryStore::new();
    let config: StatsConfig = toml::from_str("retention_days = 100000000").expect("stats table");
    let mut engine =
        ProgressionEngine::open(&store, Box::new(FixedClock(at("2026-03-09T12:00:00"))), &config);
    complete_at(&mut engine, at("2026-03-09T12:00:00"));
    assert_eq!(engine.state().total_tasks_completed, 1);
    assert_eq!(
        engine.state().weekly_stats.get(&at("2026-03-09T00:00:00").date()),
        Some(&1)
    );
}

#[test]
fn weekly_series_tracks_completions() {
    let store = MemoryStore::new();
    let mut engine = engine(&store, "2026-03-09T12:00:00");
    complete_at(&mut engine, at("2026-03-08T12:00:00"));
    complete_at(&mut engine, at("2026-03-09T10:00:00"));
    complete_at(&mut engine, at("2026-03-09T11:00:00"));
    let series = engine.weekly_series();
    assert_eq!(series.len(), 7);
    assert_eq!(series[5].completed, 1);
    assert_eq!(series[6].completed, 2);
    assert_eq!(series[6].date, at("2026-03-09T00:00:00").date());
}
