//! questlog - gamified task tracking
//!
//! The heart of this library is the progression engine: it turns task
//! lifecycle events into experience points, levels, daily streaks and badge
//! unlocks. A small file-backed task list and a CLI sit on top of it.
//!
//! # Core Concepts
//!
//! - **XP and levels**: every completion is worth 10 XP, badges add their
//!   reward; the level is derived from XP alone
//! - **Streaks**: consecutive local calendar days with at least one completion
//! - **Badges**: a static catalog of rules, each unlocked at most once
//! - **Catch-up pass**: count, streak and level badges are re-derived from
//!   stored state whenever a session opens
//!
//! # Module Organization
//!
//! - `badge`: Badge catalog and unlock rules
//! - `clock`: Injectable local wall clock
//! - `engine`: Progression engine and notifications
//! - `level`: XP to level math
//! - `state`: Persisted progression record and lenient decoding
//! - `storage`: Data directory layout and the `ProgressStore` seam
//! - `lock`: File locking and atomic writes
//! - `task`: Minimal task list
//! - `export`: Export documents and import parsing
//! - `events`: JSONL event stream
//! - `config`: Configuration loading from `questlog.toml`
//! - `output`: Human and JSON command output
//! - `cli`: Command-line interface using clap
//! - `error`: Error types and result aliases

pub mod badge;
pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod export;
pub mod level;
pub mod lock;
pub mod output;
pub mod state;
pub mod storage;
pub mod task;

pub use engine::{Notification, Outcome, ProgressionEngine};
pub use error::{Error, Result};
