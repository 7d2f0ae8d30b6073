//! `vmh import`: install exchange files through the installer routine.

use super::helpers::{indent_lines, print_json, report_brief, status_word};
use anyhow::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use vmh_common::import::{FileImport, Invocation};
use vmh_common::{BashRunner, ErrorCode, ImportOutcome, ImportReport, Importer, VmhConfig};

const RULE_WIDTH: usize = 60;

pub async fn run(
    config: &VmhConfig,
    dir: Option<PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<ExitCode> {
    let mut import = config.import.clone();
    if let Some(dir) = dir {
        import.prd_dir = dir;
    }
    debug!("Importing from {}", import.prd_dir.display());

    let importer = Importer::new(BashRunner::new(), config.vista.clone(), import.clone());
    let report = importer.run(dry_run).await?;

    if json {
        print_json(&report)?;
    } else {
        render(&report, &import.routine);
    }
    Ok(ExitCode::SUCCESS)
}

fn render(report: &ImportReport, routine: &str) {
    if report.files.is_empty() {
        println!("No PRD files found in {}", report.dir.display());
        println!(
            "Place .PRD files in {}/ and run again.",
            report.dir.display()
        );
        return;
    }

    println!("Found {} PRD file(s):", report.files.len());
    for file in &report.files {
        println!("  {} ({} bytes)", file.name, file.size);
    }

    if report.dry_run {
        println!();
        println!("Dry run, commands not executed:");
        for script in &report.planned {
            println!("  {script}");
        }
        return;
    }

    println!("Calling D ALL^{routine} to import all PRD files...");
    if let Some(batch) = &report.batch {
        print_invocation(batch);
        match batch.exit_code {
            Some(code) => println!("Return code: {code}"),
            None => println!("Return code: {}", batch.outcome.label()),
        }
    }

    if report.fell_back() {
        report_brief(ErrorCode::ImportBatchFailed);
        println!();
        println!("Batch import may have had issues. Trying individual files...");
        for file in &report.fallback {
            print_file_result(file);
        }
    }

    let rule = "=".repeat(RULE_WIDTH);
    println!();
    println!("{rule}");
    println!("PRD import complete.");
    println!("Verify in CPRS: Tools > Reminders > Reminder Dialogs");
    println!("{rule}");
}

fn print_invocation(invocation: &Invocation) {
    println!("STDOUT: {}", invocation.stdout);
    if !invocation.stderr.is_empty() {
        println!("STDERR: {}", invocation.stderr);
    }
    if let ImportOutcome::Error { message } = &invocation.outcome {
        println!("{}", indent_lines(message, "  "));
    }
}

fn print_file_result(file: &FileImport) {
    let invocation = &file.invocation;
    println!("Importing: {}", file.file);
    if let Some(code) = invocation.outcome.code() {
        report_brief(code);
    }
    match &invocation.outcome {
        ImportOutcome::Error { message } => {
            println!("  {}: {}: {}", status_word("ERROR"), file.file, message);
        }
        ImportOutcome::Timeout { .. } => {
            println!("  {}: {}", status_word("TIMEOUT"), file.file);
        }
        outcome => {
            println!("STDOUT: {}", invocation.stdout);
            if !invocation.stderr.is_empty() {
                println!("STDERR: {}", invocation.stderr);
            }
            println!("  {}: {}", status_word(outcome.label()), file.file);
        }
    }
}
