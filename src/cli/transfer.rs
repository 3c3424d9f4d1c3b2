//! tasktrack export and import commands.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::{load_context, GlobalOptions};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::task;
use crate::transfer::{self, TransferFormat};

pub struct ExportOptions {
    pub path: PathBuf,
    pub format: Option<String>,
    pub global: GlobalOptions,
}

pub struct ImportOptions {
    pub path: PathBuf,
    pub format: Option<String>,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct ExportOutput {
    path: PathBuf,
    format: String,
    exported: usize,
}

#[derive(Serialize)]
struct ImportOutput {
    path: PathBuf,
    format: String,
    imported: usize,
    ids: Vec<u64>,
}

pub fn run_export(options: ExportOptions) -> Result<()> {
    let format = resolve_format(&options.path, options.format.as_deref())?;
    let ctx = load_context(&options.global)?;
    let tasks = ctx.repository.list()?;

    transfer::export_file(&options.path, format, &tasks)?;

    let mut human = HumanOutput::new(format!("Exported {} task(s)", tasks.len()));
    human.push_summary("File", options.path.display().to_string());
    human.push_summary("Format", format.to_string());

    let output = ExportOutput {
        path: options.path,
        format: format.to_string(),
        exported: tasks.len(),
    };
    emit_success(options.global.output(), "export", &output, Some(&human))
}

pub fn run_import(options: ImportOptions) -> Result<()> {
    let format = resolve_format(&options.path, options.format.as_deref())?;
    let batch = transfer::import_file(&options.path, format)?;
    let renumbered = batch
        .iter()
        .filter(|task| task.id != task::UNASSIGNED_ID)
        .count();

    let ctx = load_context(&options.global)?;
    let imported = ctx.repository.import_batch(batch)?;
    let ids: Vec<u64> = imported.iter().map(|task| task.id).collect();

    let mut human = HumanOutput::new(format!("Imported {} task(s)", ids.len()));
    human.push_summary("File", options.path.display().to_string());
    human.push_summary("Format", format.to_string());
    if let (Some(first), Some(last)) = (ids.first(), ids.last()) {
        human.push_summary("Ids", format!("{first}..={last}"));
    }
    if renumbered > 0 {
        human.push_warning(format!(
            "{renumbered} record(s) carried an id; new ids were assigned"
        ));
    }

    let output = ImportOutput {
        path: options.path,
        format: format.to_string(),
        imported: ids.len(),
        ids,
    };
    emit_success(options.global.output(), "import", &output, Some(&human))
}

fn resolve_format(path: &Path, explicit: Option<&str>) -> Result<TransferFormat> {
    match explicit {
        Some(format) => format.parse(),
        None => TransferFormat::from_path(path),
    }
}
