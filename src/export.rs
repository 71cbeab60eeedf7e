//! Export and import documents.
//!
//! An export bundles the task list and the progression record:
//!
//! ```json
//! { "tasks": [...], "gamification": {...}, "exportDate": "...", "version": "1.0.0" }
//! ```
//!
//! Import accepts either such a document or a bare progression snapshot.
//! Task entries are decoded one by one so that a document produced by an
//! older tracker (UTC timestamps with a `Z` suffix, extra fields) still loads.

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::state::ProgressionState;
use crate::task::Task;

pub const EXPORT_VERSION: &str = "1.0.0";

const CSV_HEADERS: [&str; 4] = ["Text", "Completed", "Created At", "Completed At"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument<'a> {
    pub tasks: &'a [Task],
    pub gamification: &'a ProgressionState,
    pub export_date: NaiveDateTime,
    pub version: &'static str,
}

impl<'a> ExportDocument<'a> {
    pub fn new(tasks: &'a [Task], gamification: &'a ProgressionState, now: NaiveDateTime) -> Self {
        Self {
            tasks,
            gamification,
            export_date: now,
            version: EXPORT_VERSION,
        }
    }
}

/// What an import file asks us to replace.
#[derive(Debug, Clone, Default)]
pub struct ImportPayload {
    /// Replacement task list, when the document carries one
    pub tasks: Option<Vec<Task>>,
    /// Raw progression snapshot, decoded leniently by the engine
    pub gamification: Option<Value>,
    /// Task entries that could not be decoded
    pub skipped_tasks: usize,
}

/// Parse an import file.
pub fn parse_import(raw: &str, now: NaiveDateTime) -> Result<ImportPayload> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| Error::InvalidImport(format!("not valid JSON: {err}")))?;
    let Some(object) = value.as_object() else {
        return Err(Error::InvalidImport("expected a JSON object".to_string()));
    };

    if !is_export_document(object) {
        return Ok(ImportPayload {
            gamification: Some(value),
            ..ImportPayload::default()
        });
    }

    let mut payload = ImportPayload::default();
    match object.get("tasks") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            let mut tasks = Vec::with_capacity(items.len());
            for item in items {
                match task_from_value(item, now) {
                    Some(task) => tasks.push(task),
                    None => payload.skipped_tasks += 1,
                }
            }
            if payload.skipped_tasks > 0 {
                tracing::warn!(skipped = payload.skipped_tasks, "skipped undecodable tasks");
            }
            payload.tasks = Some(tasks);
        }
        Some(_) => {
            return Err(Error::InvalidImport("`tasks` must be an array".to_string()));
        }
    }
    payload.gamification = object.get("gamification").filter(|v| !v.is_null()).cloned();
    Ok(payload)
}

fn is_export_document(object: &Map<String, Value>) -> bool {
    object.contains_key("tasks") || object.contains_key("gamification")
}

/// Decode a task entry; `None` when it has no usable text.
fn task_from_value(value: &Value, now: NaiveDateTime) -> Option<Task> {
    let text = value.get("text")?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    let created_at = value
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or(now);
    let mut task = Task::new(text, created_at);
    if let Some(id) = value
        .get("id")
        .and_then(|id| id.as_str().map(str::to_string).or_else(|| id.as_u64().map(|n| n.to_string())))
        .filter(|id| !id.trim().is_empty())
    {
        task.id = id.trim().to_ascii_lowercase();
    }
    task.completed = value.get("completed").and_then(Value::as_bool).unwrap_or(false);
    if task.completed {
        task.completed_at = value
            .get("completedAt")
            .and_then(Value::as_str)
            .and_then(parse_timestamp);
    }
    Some(task)
}

/// `YYYY-MM-DDTHH:MM:SS` with any fractional seconds or zone suffix ignored.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    let head = trimmed.get(..19).unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(head, crate::clock::LOCAL_TIME_FORMAT).ok()
}

/// Render tasks as CSV with every cell quoted.
pub fn tasks_to_csv(tasks: &[Task]) -> String {
    let mut rows = Vec::with_capacity(tasks.len() + 1);
    rows.push(csv_row(CSV_HEADERS.iter().map(|h| h.to_string())));
    for task in tasks {
        rows.push(csv_row(
            [
                task.text.clone(),
                if task.completed { "Yes" } else { "No" }.to_string(),
                task.created_at.format(crate::clock::LOCAL_TIME_FORMAT).to_string(),
                task.completed_at
                    .map(|at| at.format(crate::clock::LOCAL_TIME_FORMAT).to_string())
                    .unwrap_or_default(),
            ]
            .into_iter(),
        ));
    }
    rows.join("\n")
}

fn csv_row(cells: impl Iterator<Item = String>) -> String {
    cells
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}
