//! Task list for questlog.
//!
//! Deliberately small: the progression engine only needs creation times and
//! completion flags. Tasks are kept in `tasks.json` as a plain array, newest
//! first.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::storage::Storage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    /// Local wall-clock creation time
    pub created_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<NaiveDateTime>,
}

impl Task {
    pub fn new(text: impl Into<String>, created_at: NaiveDateTime) -> Self {
        Self {
            id: Ulid::new().to_string().to_ascii_lowercase(),
            text: text.into(),
            completed: false,
            created_at,
            completed_at: None,
        }
    }

    pub fn created_on(&self, day: NaiveDate) -> bool {
        self.created_at.date() == day
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn from_vec(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn load(storage: &Storage) -> Result<Self> {
        let tasks: Option<Vec<Task>> = storage.read_json(&storage.tasks_file())?;
        Ok(Self::from_vec(tasks.unwrap_or_default()))
    }

    pub fn save(&self, storage: &Storage) -> Result<()> {
        storage.write_json(&storage.tasks_file(), &self.tasks)
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn into_vec(self) -> Vec<Task> {
        self.tasks
    }

    pub fn add(&mut self, text: &str, now: NaiveDateTime) -> Result<Task> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidArgument("task text cannot be empty".to_string()));
        }
        let task = Task::new(text, now);
        self.tasks.insert(0, task.clone());
        Ok(task)
    }

    /// Resolve a full id or a unique prefix of one.
    pub fn resolve(&self, input: &str) -> Result<&Task> {
        let needle = input.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }

        if let Some(task) = self.tasks.iter().find(|task| task.id == needle) {
            return Ok(task);
        }

        let matches: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|task| task.id.starts_with(&needle))
            .collect();
        match matches.as_slice() {
            [] => Err(Error::TaskNotFound(input.trim().to_string())),
            [task] => Ok(*task),
            many => Err(Error::AmbiguousTaskId {
                input: input.trim().to_string(),
                matches: many.iter().map(|task| task.id.clone()).collect(),
            }),
        }
    }

    /// Mark a task completed and return the updated record.
    pub fn complete(&mut self, input: &str, now: NaiveDateTime) -> Result<Task> {
        let id = self.resolve(input)?.id.clone();
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
        if task.completed {
            return Err(Error::TaskAlreadyCompleted(id));
        }
        task.completed = true;
        task.completed_at = Some(now);
        Ok(task.clone())
    }

    /// Tasks created on `day`, the input for the perfect-day rule.
    pub fn created_on(&self, day: NaiveDate) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| task.created_on(day))
            .cloned()
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.tasks.iter().filter(|task| !task.completed).count()
    }
}
