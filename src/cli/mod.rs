//! Command-line interface for questlog
//!
//! This module defines the CLI structure using clap derive macros.
//! Each group of subcommands lives in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::error::Result;

mod data;
mod progress;
mod session;
mod task;

pub use session::Session;

/// questlog - a task list that levels you up
///
/// Completing tasks earns XP, builds daily streaks and unlocks badges.
#[derive(Parser, Debug)]
#[command(name = "questlog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "QUESTLOG_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit progression events as JSONL: `-` for stdout or a file path
    #[arg(long, global = true, env = "QUESTLOG_EVENTS")]
    pub events: Option<String>,

    /// Pin the clock to a local time (YYYY-MM-DDTHH:MM:SS)
    #[arg(long, global = true, env = "QUESTLOG_NOW", hide = true)]
    pub now: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task
    Add {
        /// Task text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Complete a task by id or unique id prefix
    Done {
        /// Task id or prefix
        id: String,
    },

    /// List tasks (open ones by default)
    List {
        /// Include completed tasks
        #[arg(long, conflicts_with = "done")]
        all: bool,

        /// Show only completed tasks
        #[arg(long)]
        done: bool,
    },

    /// Show XP, level, streak and the last seven days
    Stats,

    /// Show the badge board
    Badges {
        /// Only earned badges
        #[arg(long)]
        earned: bool,
    },

    /// Re-evaluate state-derived badges and report repairs
    Check,

    /// Export tasks and progression
    Export {
        /// Output format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import an export document or a progression snapshot (`-` for stdin)
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Delete all tasks and progression
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Flags shared by every subcommand
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
    pub events: Option<String>,
    pub now: Option<String>,
}

impl Cli {
    fn global(&self) -> GlobalOptions {
        GlobalOptions {
            data_dir: self.data_dir.clone(),
            json: self.json,
            quiet: self.quiet,
            events: self.events.clone(),
            now: self.now.clone(),
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = self.global();
        match self.command {
            Commands::Add { text } => task::run_add(task::AddOptions {
                text: text.join(" "),
                global,
            }),
            Commands::Done { id } => task::run_done(task::DoneOptions { id, global }),
            Commands::List { all, done } => task::run_list(task::ListOptions {
                filter: task::ListFilter::from_flags(all, done),
                global,
            }),
            Commands::Stats => progress::run_stats(global),
            Commands::Badges { earned } => {
                progress::run_badges(progress::BadgesOptions { earned, global })
            }
            Commands::Check => progress::run_check(global),
            Commands::Export { format, output } => data::run_export(data::ExportOptions {
                format,
                output,
                global,
            }),
            Commands::Import { file } => data::run_import(data::ImportOptions { file, global }),
            Commands::Reset { yes } => data::run_reset(data::ResetOptions { yes, global }),
        }
    }
}
