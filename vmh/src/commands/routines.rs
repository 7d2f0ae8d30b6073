//! `vmh patch-routines`: guard undefined Kernel variables in broker sign-on routines.

use super::helpers::{print_json, report_brief};
use anyhow::{Result, bail};
use colored::Colorize;
use std::process::ExitCode;
use tracing::info;
use vmh_common::{
    ErrorCode, RoutinePatch, RoutinePatchReport, RoutinePatchStatus, VmhConfig,
    builtin_routine_patches, patch_routine,
};

/// Built-in patches, optionally narrowed to one routine (case-insensitive).
fn selected_patches(routine: Option<&str>) -> Result<Vec<RoutinePatch>> {
    let all = builtin_routine_patches();
    let Some(wanted) = routine else {
        return Ok(all);
    };
    let wanted = wanted.to_uppercase();
    let selected: Vec<RoutinePatch> = all
        .into_iter()
        .filter(|patch| patch.routine.upper() == wanted)
        .collect();
    if selected.is_empty() {
        let known: Vec<String> = builtin_routine_patches()
            .iter()
            .map(|p| p.routine.to_string())
            .collect();
        bail!(
            "No built-in patch for routine {wanted} (known: {})",
            known.join(", ")
        );
    }
    Ok(selected)
}

pub fn run(
    config: &VmhConfig,
    routine: Option<&str>,
    dry_run: bool,
    json: bool,
) -> Result<ExitCode> {
    let patches = selected_patches(routine)?;

    let mut reports = Vec::with_capacity(patches.len());
    for (idx, target) in patches.iter().enumerate() {
        let report = patch_routine(&config.vista, target, dry_run);
        if !json {
            if idx > 0 {
                println!();
            }
            render(&report);
        }
        reports.push(report);
    }

    let missing = count_status(&reports, RoutinePatchStatus::NotFound);
    let failed = count_status(&reports, RoutinePatchStatus::Failed);
    info!(
        "Routine patch run finished: {} routine(s), {} missing, {} failed",
        reports.len(),
        missing,
        failed
    );

    if json {
        print_json(&reports)?;
    } else {
        println!();
        println!("=== All patches complete ===");
    }

    Ok(exit_code(&reports))
}

fn count_status(reports: &[RoutinePatchReport], status: RoutinePatchStatus) -> usize {
    reports.iter().filter(|r| r.status == status).count()
}

/// Failure when any routine was missing or could not be patched.
fn exit_code(reports: &[RoutinePatchReport]) -> ExitCode {
    if reports.iter().all(|r| r.status.is_success()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn render(report: &RoutinePatchReport) {
    let file = format!("{}.m", report.routine.upper());
    println!("=== Patching {file} ===");

    let Some(path) = &report.path else {
        println!("{} {file} not found!", "ERROR:".red());
        report_brief(ErrorCode::RoutineNotFound);
        return;
    };
    println!("Found: {}", path.display());

    match report.status {
        RoutinePatchStatus::Patched => {
            for insertion in &report.insertions {
                println!(
                    "  Fixed {} at line {}",
                    insertion.label, insertion.line_number
                );
            }
            let verb = if report.dry_run { "Would remove" } else { "Removed" };
            for object in &report.removed_objects {
                println!("  {verb} {}", object.display());
            }
            if report.dry_run {
                println!("  Would patch {} locations", report.insertions.len());
            } else {
                println!("  Patched {} locations", report.insertions.len());
            }
        }
        RoutinePatchStatus::AlreadyPatched => {
            println!("  Already patched or not found");
            for candidate in &report.candidate_labels {
                println!(
                    "  Found label at {}: {}",
                    candidate.line_number, candidate.text
                );
            }
        }
        RoutinePatchStatus::Failed => {
            if let Some(failure) = &report.failure {
                println!("  {} {}", "ERROR:".red(), failure.message);
                report_brief(failure.error_code);
            }
        }
        RoutinePatchStatus::NotFound => {}
    }
}
