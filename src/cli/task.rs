//! questlog task command implementations: add, done, list.

use serde::Serialize;

use crate::engine::{Notification, Stats};
use crate::error::Result;
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::task::Task;

use super::session::Session;
use super::GlobalOptions;

const SHORT_ID_LEN: usize = 12;

pub struct AddOptions {
    pub text: String,
    pub global: GlobalOptions,
}

pub struct DoneOptions {
    pub id: String,
    pub global: GlobalOptions,
}

pub struct ListOptions {
    pub filter: ListFilter,
    pub global: GlobalOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter {
    Open,
    Completed,
    All,
}

impl ListFilter {
    pub fn from_flags(all: bool, done: bool) -> Self {
        match (all, done) {
            (true, _) => ListFilter::All,
            (false, true) => ListFilter::Completed,
            (false, false) => ListFilter::Open,
        }
    }

    fn accepts(self, task: &Task) -> bool {
        match self {
            ListFilter::Open => !task.completed,
            ListFilter::Completed => task.completed,
            ListFilter::All => true,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskAddedOutput {
    task: Task,
    notifications: Vec<Notification>,
    xp: u64,
    level: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskCompletedOutput {
    task: Task,
    xp_gained: u64,
    notifications: Vec<Notification>,
    stats: Stats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskListOutput {
    total: usize,
    open: usize,
    tasks: Vec<Task>,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut session = Session::open(&options.global)?;
    let mut tasks = session.tasks()?;
    let task = tasks.add(&options.text, session.now)?;
    tasks.save(&session.storage)?;
    session.emit(EventKind::TaskAdded, &task);

    let outcome = session.engine.on_task_added(&task, session.now);
    session.absorb(&outcome);

    let mut notifications = session.startup_notifications().to_vec();
    notifications.extend(outcome.notifications);

    let mut human = HumanOutput::new("Task added");
    human.push_summary("ID", short_id(&task.id));
    human.push_summary("Text", task.text.clone());
    session.annotate(&mut human, &notifications);
    human.push_next_step(format!("questlog done {}", short_id(&task.id)));

    let state = session.engine.state();
    let output = TaskAddedOutput {
        task,
        notifications,
        xp: state.xp,
        level: state.level,
    };
    emit_success(session.output_options(), "add", &output, Some(&human))
}

pub fn run_done(options: DoneOptions) -> Result<()> {
    let mut session = Session::open(&options.global)?;
    let mut tasks = session.tasks()?;
    let now = session.now;
    let task = tasks.complete(&options.id, now)?;
    tasks.save(&session.storage)?;

    let xp_before = session.engine.state().xp;
    let todays_tasks = tasks.created_on(now.date());
    let outcome = session.engine.on_task_completed(&task, now, &todays_tasks);
    let xp_gained = session.engine.state().xp.saturating_sub(xp_before);

    session.emit(
        EventKind::TaskCompleted,
        serde_json::json!({ "task": &task, "xpGained": xp_gained }),
    );
    session.absorb(&outcome);

    let mut notifications = session.startup_notifications().to_vec();
    notifications.extend(outcome.notifications);
    let stats = session.engine.stats();

    let mut human = HumanOutput::new("Task completed");
    human.push_summary("Task", task.text.clone());
    human.push_summary("XP", format!("+{xp_gained} (total {})", stats.xp));
    human.push_summary("Level", stats.level.to_string());
    human.push_summary("Streak", day_count(stats.streak));
    session.annotate(&mut human, &notifications);

    let output = TaskCompletedOutput {
        task,
        xp_gained,
        notifications,
        stats,
    };
    emit_success(session.output_options(), "done", &output, Some(&human))
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let session = Session::open(&options.global)?;
    let list = session.tasks()?;
    let open = list.open_count();
    let tasks: Vec<Task> = list
        .into_vec()
        .into_iter()
        .filter(|task| options.filter.accepts(task))
        .collect();

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Shown", tasks.len().to_string());
    human.push_summary("Open", open.to_string());
    for task in &tasks {
        let mark = if task.completed { "x" } else { " " };
        human.push_detail(format!("[{mark}] {}  {}", short_id(&task.id), task.text));
    }
    if tasks.is_empty() && options.filter == ListFilter::Open {
        human.push_next_step("questlog add <text>");
    }
    session.annotate(&mut human, session.startup_notifications());

    let output = TaskListOutput {
        total: tasks.len(),
        open,
        tasks,
    };
    emit_success(session.output_options(), "list", &output, Some(&human))
}

pub(super) fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

pub(super) fn day_count(days: u32) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}
