//! Per-invocation wiring: data dir, config, clock, engine and event sink.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::clock;
use crate::config::Config;
use crate::engine::{Notification, Outcome, ProgressionEngine};
use crate::error::Result;
use crate::events::{Event, EventDestination, EventKind, EventSink};
use crate::lock::{LockGuard, DEFAULT_LOCK_TIMEOUT};
use crate::output::{HumanOutput, OutputOptions};
use crate::storage::{resolve_data_dir, Storage};
use crate::task::TaskList;

use super::GlobalOptions;

pub struct Session {
    pub storage: Storage,
    pub config: Config,
    pub engine: ProgressionEngine<Storage>,
    pub now: NaiveDateTime,
    sink: Option<EventSink>,
    events_to_stdout: bool,
    json: bool,
    quiet: bool,
    warnings: Vec<String>,
    startup: Outcome,
    _exclusive: LockGuard,
}

impl Session {
    /// Open the data directory and load progression.
    ///
    /// The catch-up badge pass runs here so that restored or hand-edited
    /// state is repaired before any command looks at it. The session keeps
    /// the data directory locked until it is dropped, so concurrent commands
    /// run one after another instead of overwriting each other's updates.
    pub fn open(global: &GlobalOptions) -> Result<Self> {
        let storage = Storage::new(resolve_data_dir(global.data_dir.as_deref()));
        let exclusive = LockGuard::acquire(&storage.session_lock_file(), DEFAULT_LOCK_TIMEOUT)?;
        let config = Config::load_from_dir(storage.root());
        let clock = clock::from_override(global.now.as_deref())?;
        let now = clock.now();

        let destination = EventDestination::parse(global.events.as_deref())
            .or_else(|| EventDestination::parse(config.events.output.as_deref()))
            .map(|dest| dest.resolve_against(storage.root()));
        let events_to_stdout = matches!(destination, Some(EventDestination::Stdout));
        let sink = destination.as_ref().map(EventDestination::open).transpose()?;

        tracing::debug!(root = %storage.root().display(), %now, "session opened");
        let mut engine = ProgressionEngine::open(storage.clone(), clock, &config.stats);
        let startup = engine.check_all_badges();

        let mut session = Self {
            storage,
            config,
            engine,
            now,
            sink,
            events_to_stdout,
            json: global.json,
            quiet: global.quiet,
            warnings: Vec::new(),
            startup: Outcome::default(),
            _exclusive: exclusive,
        };
        session.absorb(&startup);
        session.startup = startup;
        Ok(session)
    }

    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            json: self.json && !self.events_to_stdout,
            quiet: self.quiet || self.events_to_stdout,
        }
    }

    pub fn tasks(&self) -> Result<TaskList> {
        TaskList::load(&self.storage)
    }

    /// Notifications produced by the catch-up pass at open.
    pub fn startup_notifications(&self) -> &[Notification] {
        &self.startup.notifications
    }

    /// Forward an engine outcome to the event stream and collect warnings.
    pub fn absorb(&mut self, outcome: &Outcome) {
        if let Some(err) = &outcome.persist_error {
            self.warnings.push(format!("progress not saved: {err}"));
        }
        if let Some(sink) = self.sink.as_mut() {
            if let Err(err) = sink.emit_notifications(&outcome.notifications, self.now) {
                self.warnings.push(format!("event output failed: {err}"));
            }
        }
    }

    /// Emit a task-level event with a payload.
    pub fn emit<T: Serialize>(&mut self, kind: EventKind, data: T) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let result = Event::new(kind, self.now)
            .with_data(data)
            .and_then(|event| sink.emit(&event));
        if let Err(err) = result {
            self.warnings.push(format!("event output failed: {err}"));
        }
    }

    /// Describe notifications and collected warnings in a human report.
    pub fn annotate(&self, human: &mut HumanOutput, notes: &[Notification]) {
        describe_notifications(human, notes);
        for warning in &self.warnings {
            human.push_warning(warning.clone());
        }
    }
}

pub fn describe_notifications(human: &mut HumanOutput, notes: &[Notification]) {
    for note in notes {
        match note {
            Notification::BadgeUnlocked(unlock) => human.push_detail(format!(
                "Badge unlocked: {} (+{} XP) - {}",
                unlock.name, unlock.xp_reward, unlock.description
            )),
            Notification::LevelUp { new_level } => {
                human.push_detail(format!("Level up! You reached level {new_level}"))
            }
            Notification::StateReplaced { .. } => {}
        }
    }
}
