//! Shared output formatting for questlog commands.
//!
//! Every command returns either a human report or, with `--json`, a
//! versioned envelope `{schema_version, command, status, data}`.

use std::fmt;

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};

pub const SCHEMA_VERSION: &str = "questlog.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// A human-readable command report.
///
/// Renders as a title line followed by the non-empty sections among
/// `Summary`, `Details`, `Warnings` and `Next steps`. In JSON mode only the
/// warnings and next steps travel along with the data.
#[derive(Debug, Clone, Default)]
pub struct HumanOutput {
    title: String,
    facts: Vec<(String, String)>,
    notes: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// `key: value` line; an empty value prints the key alone.
    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.facts.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn push_next_step(&mut self, step: impl Into<String>) {
        self.next_steps.push(step.into());
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)?;
        let facts = self.facts.iter().map(|(key, value)| match value.as_str() {
            "" => key.clone(),
            value => format!("{key}: {value}"),
        });
        write_section(f, "Summary", facts)?;
        write_section(f, "Details", self.notes.iter().cloned())?;
        write_section(f, "Warnings", self.warnings.iter().cloned())?;
        write_section(f, "Next steps", self.next_steps.iter().cloned())
    }
}

fn write_section(
    f: &mut fmt::Formatter<'_>,
    heading: &str,
    items: impl Iterator<Item = String>,
) -> fmt::Result {
    let mut items = items.peekable();
    if items.peek().is_none() {
        return Ok(());
    }
    write!(f, "\n\n{heading}:")?;
    for item in items {
        write!(f, "\n- {item}")?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Status {
    Success,
    Error,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// Versioned JSON envelope shared by success and error output.
#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "no_items")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "no_items")]
    next_steps: &'a [String],
}

fn no_items(items: &&[String]) -> bool {
    items.is_empty()
}

/// Render the success envelope for `data`.
pub fn render_success<T: Serialize>(
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<String> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        command,
        status: Status::Success,
        data: Some(data),
        error: None,
        warnings: human.map(|h| h.warnings.as_slice()).unwrap_or_default(),
        next_steps: human.map(|h| h.next_steps.as_slice()).unwrap_or_default(),
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Render the error envelope for `err`.
pub fn render_error(command: &str, err: &Error) -> Result<String> {
    let next_steps = error_next_steps(err);
    let envelope: Envelope<'_, ()> = Envelope {
        schema_version: SCHEMA_VERSION,
        command,
        status: Status::Error,
        data: None,
        error: Some(ErrorBody {
            message: err.to_string(),
            code: err.exit_code(),
            kind: error_kind(err),
            details: err.details(),
        }),
        warnings: &[],
        next_steps: &next_steps,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        println!("{}", render_success(command, data, human)?);
    } else if let (false, Some(human)) = (options.quiet, human) {
        println!("{human}");
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    if json {
        println!("{}", render_error(command, err)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = error_next_steps(err).first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    output.to_string()
}

pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

/// First positional argument, skipping global flags and their values.
fn command_name_from(args: impl Iterator<Item = String>) -> String {
    let mut args = args;
    while let Some(arg) = args.next() {
        if matches!(arg.as_str(), "--data-dir" | "--events" | "--now") {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return arg;
    }
    "questlog".to_string()
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        exit_codes::USER_ERROR => "user_error",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::TaskNotFound(_) => vec!["questlog list --all".to_string()],
        Error::AmbiguousTaskId { matches, .. } => matches
            .iter()
            .take(3)
            .map(|id| format!("questlog done {id}"))
            .collect(),
        Error::TaskAlreadyCompleted(_) => vec!["questlog list".to_string()],
        Error::InvalidConfig(_) => vec!["fix questlog.toml then retry".to_string()],
        Error::InvalidImport(_) => {
            vec!["questlog export > backup.json to see the expected layout".to_string()]
        }
        Error::LockFailed(_) => vec!["retry once the other questlog process exits".to_string()],
        _ => Vec::new(),
    }
}
