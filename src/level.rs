//! XP and level math.
//!
//! Level is a pure function of XP: `floor(1 + sqrt(xp / 100))`. Level `n`
//! starts at `100 * (n - 1)^2` XP, so levels get quadratically more expensive.

use serde::Serialize;

/// XP awarded for every completed task.
pub const BASE_TASK_XP: u64 = 10;

/// XP scale of the level curve.
const XP_PER_LEVEL_UNIT: u64 = 100;

/// Level reached with the given XP.
pub fn level_for_xp(xp: u64) -> u32 {
    let root = (xp as f64 / XP_PER_LEVEL_UNIT as f64).sqrt();
    (1.0 + root).floor() as u32
}

/// Total XP at which `level` begins. Saturates at `u64::MAX`.
pub fn xp_for_level(level: u32) -> u64 {
    let steps = u64::from(level.saturating_sub(1));
    steps.saturating_mul(steps).saturating_mul(XP_PER_LEVEL_UNIT)
}

/// Position of the current XP inside its level band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct XpProgress {
    /// XP earned since the current level started
    pub current: u64,
    /// XP width of the current level
    pub needed: u64,
    /// `current / needed` as a percentage, capped at 100
    pub percentage: f64,
}

impl XpProgress {
    pub fn for_xp(xp: u64) -> Self {
        let level = level_for_xp(xp);
        let floor = xp_for_level(level);
        let ceiling = xp_for_level(level.saturating_add(1));
        let current = xp.saturating_sub(floor);
        // Both bounds saturate near u64::MAX, where the band collapses.
        let needed = ceiling.saturating_sub(floor).max(1);
        let percentage = (current as f64 / needed as f64 * 100.0).min(100.0);
        Self {
            current,
            needed,
            percentage,
        }
    }
}
