//! Property-based tests for level math and the progression engine.
//!
//! - level is the fixed function of xp and never decreases
//! - xp lands inside the band of its level
//! - arbitrary completion/addition sequences keep the state invariants
//! - lenient decoding accepts any JSON shape

use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime};
use proptest::prelude::*;
use serde_json::{json, Value};

use questlog::clock::{parse_local, FixedClock};
use questlog::config::StatsConfig;
use questlog::engine::ProgressionEngine;
use questlog::level::{level_for_xp, xp_for_level, XpProgress};
use questlog::state::ProgressionState;
use questlog::storage::MemoryStore;
use questlog::task::Task;

const MAX_XP: u64 = 50_000_000;

fn epoch() -> NaiveDateTime {
    parse_local("2026-03-02T00:00:00").expect("epoch")
}

// =============================================================================
// Proptest strategies
// =============================================================================

#[derive(Debug, Clone)]
enum Step {
    Add { minutes: i64 },
    Complete { minutes: i64 },
    Reward(u64),
}

/// Steps spread over roughly six weeks of local time.
fn arb_step() -> impl Strategy<Value = Step> {
    let minutes = 0i64..60 * 24 * 42;
    prop_oneof![
        minutes.clone().prop_map(|minutes| Step::Add { minutes }),
        minutes.prop_map(|minutes| Step::Complete { minutes }),
        (0u64..2_000).prop_map(Step::Reward),
    ]
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        (-1e6f64..1e6).prop_map(|f| json!(f)),
        "[a-zA-Z0-9:-]{0,24}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::hash_map("[a-zA-Z]{1,20}", inner, 0..6)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Snapshots that use the real field names with arbitrary values.
fn arb_snapshot() -> impl Strategy<Value = Value> {
    (
        arb_json(),
        arb_json(),
        arb_json(),
        arb_json(),
        arb_json(),
        arb_json(),
        arb_json(),
    )
        .prop_map(|(xp, level, streak, last, badges, total, weekly)| {
            json!({
                "xp": xp,
                "level": level,
                "streak": streak,
                "lastCompletedDate": last,
                "badges": badges,
                "totalTasksCompleted": total,
                "weeklyStats": weekly,
            })
        })
}

// =============================================================================
// Level math
// =============================================================================

proptest! {
    #[test]
    fn level_matches_formula(xp in 0u64..MAX_XP) {
        let expected = (1.0 + (xp as f64 / 100.0).sqrt()).floor() as u32;
        prop_assert_eq!(level_for_xp(xp), expected);
    }

    #[test]
    fn level_is_monotonic(a in 0u64..MAX_XP, b in 0u64..MAX_XP) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(level_for_xp(low) <= level_for_xp(high));
    }

    #[test]
    fn xp_sits_inside_its_level_band(xp in 0u64..MAX_XP) {
        let level = level_for_xp(xp);
        prop_assert!(xp_for_level(level) <= xp);
        prop_assert!(xp < xp_for_level(level + 1));

        let progress = XpProgress::for_xp(xp);
        prop_assert!(progress.current < progress.needed);
        prop_assert!((0.0..100.0).contains(&progress.percentage));
    }
}

// =============================================================================
// Engine invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_histories_keep_invariants(steps in prop::collection::vec(arb_step(), 1..60)) {
        let store = MemoryStore::new();
        let mut engine = ProgressionEngine::open(
            &store,
            Box::new(FixedClock(epoch())),
            &StatsConfig::default(),
        );
        let mut completions = 0u64;
        let mut last_now = epoch();

        for step in steps {
            let xp_before = engine.state().xp;
            let badges_before = engine.state().badges.clone();
            match step {
                Step::Add { minutes } => {
                    let added_at = epoch() + Duration::minutes(minutes);
                    let task = Task::new("generated", added_at);
                    engine.on_task_added(&task, added_at);
                }
                Step::Complete { minutes } => {
                    // Completions move forward in time like a real clock.
                    let now = last_now.max(epoch() + Duration::minutes(minutes));
                    last_now = now;
                    let task = Task::new("generated", now);
                    engine.on_task_completed(&task, now, &[]);
                    completions += 1;
                }
                Step::Reward(amount) => {
                    engine.add_xp(amount);
                }
            }

            let state = engine.state();
            prop_assert_eq!(state.level, level_for_xp(state.xp));
            prop_assert!(state.xp >= xp_before);
            prop_assert!(state.badges.starts_with(&badges_before));
            let unique: HashSet<_> = state.badges.iter().collect();
            prop_assert_eq!(unique.len(), state.badges.len());
            prop_assert_eq!(state.total_tasks_completed, completions);
            if completions > 0 {
                prop_assert!(state.streak >= 1);
                prop_assert!(state.has_badge("firstTask"));
            }
            if state.level >= 5 {
                prop_assert!(state.has_badge("level5"));
            }
            if state.total_tasks_completed >= 10 {
                prop_assert!(state.has_badge("taskMaster"));
            }
        }

        let saved = store.record().map(|raw| ProgressionState::from_value(&raw, epoch().date()));
        if let Some(saved) = saved {
            prop_assert_eq!(&saved, engine.state());
        }
    }

    #[test]
    fn catch_up_pass_is_idempotent(snapshot in arb_snapshot()) {
        let store = MemoryStore::with_record(snapshot);
        let mut engine = ProgressionEngine::open(
            &store,
            Box::new(FixedClock(epoch())),
            &StatsConfig::default(),
        );
        engine.check_all_badges();
        let settled = engine.snapshot();
        let again = engine.check_all_badges();
        prop_assert!(again.notifications.is_empty());
        prop_assert_eq!(engine.snapshot(), settled);
    }
}

// =============================================================================
// Lenient decoding
// =============================================================================

proptest! {
    #[test]
    fn decoding_never_fails(value in arb_json()) {
        let state = ProgressionState::from_value(&value, epoch().date());
        prop_assert_eq!(state.level, level_for_xp(state.xp));
    }

    #[test]
    fn decoding_snapshots_keeps_invariants(value in arb_snapshot()) {
        let state = ProgressionState::from_value(&value, epoch().date());
        prop_assert_eq!(state.level, level_for_xp(state.xp));
        let unique: HashSet<_> = state.badges.iter().collect();
        prop_assert_eq!(unique.len(), state.badges.len());

        let encoded = serde_json::to_value(&state).expect("encode");
        prop_assert_eq!(ProgressionState::from_value(&encoded, epoch().date()), state);
    }
}
