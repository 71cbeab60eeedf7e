//! questlog data commands: export, import, reset.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::engine::Stats;
use crate::error::{Error, Result};
use crate::export::{parse_import, tasks_to_csv, ExportDocument};
use crate::lock;
use crate::output::{emit_success, HumanOutput};
use crate::task::TaskList;

use super::session::Session;
use super::{ExportFormat, GlobalOptions};

pub struct ExportOptions {
    pub format: ExportFormat,
    pub output: Option<PathBuf>,
    pub global: GlobalOptions,
}

pub struct ImportOptions {
    pub file: PathBuf,
    pub global: GlobalOptions,
}

pub struct ResetOptions {
    pub yes: bool,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportOutput {
    path: PathBuf,
    format: &'static str,
    tasks: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportOutput {
    tasks_imported: Option<usize>,
    tasks_skipped: usize,
    progression_imported: bool,
    stats: Stats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetOutput {
    tasks_removed: usize,
    stats: Stats,
}

pub fn run_export(options: ExportOptions) -> Result<()> {
    let session = Session::open(&options.global)?;
    let tasks = session.tasks()?;
    let state = session.engine.snapshot();

    let (body, format) = match options.format {
        ExportFormat::Json => {
            let doc = ExportDocument::new(tasks.all(), &state, session.now);
            (serde_json::to_string_pretty(&doc)?, "json")
        }
        ExportFormat::Csv => (tasks_to_csv(tasks.all()), "csv"),
    };

    let Some(path) = options.output else {
        println!("{body}");
        return Ok(());
    };
    lock::write_atomic(&path, body.as_bytes())?;
    tracing::info!(path = %path.display(), format, "exported");

    let mut human = HumanOutput::new("Exported");
    human.push_summary("File", path.display().to_string());
    human.push_summary("Tasks", tasks.all().len().to_string());
    session.annotate(&mut human, session.startup_notifications());

    let output = ExportOutput {
        path,
        format,
        tasks: tasks.all().len(),
    };
    emit_success(session.output_options(), "export", &output, Some(&human))
}

pub fn run_import(options: ImportOptions) -> Result<()> {
    let mut session = Session::open(&options.global)?;
    let raw = read_input(&options.file)?;
    let payload = parse_import(&raw, session.now)?;
    if payload.tasks.is_none() && payload.gamification.is_none() {
        return Err(Error::InvalidImport(
            "document has neither tasks nor gamification".to_string(),
        ));
    }

    let tasks_imported = match payload.tasks {
        Some(tasks) => {
            let count = tasks.len();
            TaskList::from_vec(tasks).save(&session.storage)?;
            Some(count)
        }
        None => None,
    };

    let mut human = HumanOutput::new("Import complete");
    if let Some(count) = tasks_imported {
        human.push_summary("Tasks", count.to_string());
    }
    if payload.skipped_tasks > 0 {
        human.push_warning(format!("skipped {} unreadable tasks", payload.skipped_tasks));
    }

    let progression_imported = match &payload.gamification {
        Some(snapshot) => {
            let outcome = session.engine.import_state(snapshot);
            session.absorb(&outcome);
            true
        }
        None => false,
    };
    let stats = session.engine.stats();
    if progression_imported {
        human.push_summary("Level", stats.level.to_string());
        human.push_summary("XP", stats.xp.to_string());
        human.push_summary("Badges", stats.badges.len().to_string());
    }
    session.annotate(&mut human, &[]);

    let output = ImportOutput {
        tasks_imported,
        tasks_skipped: payload.skipped_tasks,
        progression_imported,
        stats,
    };
    emit_success(session.output_options(), "import", &output, Some(&human))
}

pub fn run_reset(options: ResetOptions) -> Result<()> {
    if !options.yes {
        return Err(Error::InvalidArgument(
            "reset deletes all tasks and progress; pass --yes to confirm".to_string(),
        ));
    }
    let mut session = Session::open(&options.global)?;
    let tasks_removed = session.tasks()?.all().len();
    TaskList::default().save(&session.storage)?;

    let outcome = session.engine.reset();
    session.absorb(&outcome);

    let mut human = HumanOutput::new("All data has been reset");
    human.push_summary("Tasks removed", tasks_removed.to_string());
    session.annotate(&mut human, &[]);

    let output = ResetOutput {
        tasks_removed,
        stats: session.engine.stats(),
    };
    emit_success(session.output_options(), "reset", &output, Some(&human))
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        return Ok(raw);
    }
    std::fs::read_to_string(path).map_err(|err| {
        Error::InvalidArgument(format!("cannot read {}: {err}", path.display()))
    })
}
