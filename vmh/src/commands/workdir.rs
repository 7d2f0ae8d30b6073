//! `vmh patch-workdir`: point the health summary object routine at `/tmp/`.

use super::helpers::{print_json, report_brief, status_word};
use anyhow::Result;
use std::process::ExitCode;
use vmh_common::{ErrorCode, VmhConfig, WorkdirPatchReport, WorkdirPatchStatus, patch_workdir};

pub fn run(config: &VmhConfig, dry_run: bool, json: bool) -> Result<ExitCode> {
    let report = patch_workdir(&config.vista, &config.workdir_patch, dry_run)?;

    if json {
        print_json(&report)?;
    } else {
        render(&report);
    }

    Ok(if report.status.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn render(report: &WorkdirPatchReport) {
    let verb = if report.dry_run { "Would delete" } else { "Deleted" };
    for path in &report.removed_objects {
        println!("{verb} {}", path.display());
    }

    let file = report.routine.source_file();
    match report.status {
        WorkdirPatchStatus::NotFound => {
            println!("{file} not found at {}", report.path.display());
            report_brief(ErrorCode::RoutineNotFound);
        }
        WorkdirPatchStatus::AlreadyPatched => println!("{file} already patched."),
        WorkdirPatchStatus::MarkerMissing => {
            println!(
                "{}: Pattern not found in {file}: {}",
                status_word("WARNING"),
                report.old_marker
            );
            report_brief(ErrorCode::RoutineMarkerMissing);
        }
        WorkdirPatchStatus::Patched if report.dry_run => println!(
            "Would patch {file}: {} -> {}",
            report.old_marker, report.new_marker
        ),
        WorkdirPatchStatus::Patched => println!(
            "Patched {file}: {} -> {}",
            report.old_marker, report.new_marker
        ),
    }
}
