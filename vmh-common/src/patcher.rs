//! Routine maintenance flows: guard insertion and working-directory fix.
//!
//! Each flow returns a serializable report; rendering is left to the CLI.

use crate::config::{VistaSettings, WorkdirPatchSettings};
use crate::errors::ErrorCode;
use crate::label_patch::{
    CandidateLabel, Insertion, RoutinePatch, apply_label_patches, candidate_labels,
};
use crate::marker::{Substitution, plan_substitution};
use crate::routine::{
    PatchError, RoutineName, find_compiled_objects, locate_routine, objects_in_dirs, read_routine,
    remove_compiled_objects, remove_objects_in_dirs, write_routine,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutinePatchStatus {
    Patched,
    AlreadyPatched,
    NotFound,
    /// Located but not patched; see `RoutinePatchReport::failure`.
    Failed,
}

impl RoutinePatchStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Patched | Self::AlreadyPatched)
    }
}

/// Why a located routine could not be patched.
#[derive(Debug, Clone, Serialize)]
pub struct RoutineFailure {
    pub code: String,
    pub message: String,
    #[serde(skip)]
    pub error_code: ErrorCode,
}

impl From<&PatchError> for RoutineFailure {
    fn from(err: &PatchError) -> Self {
        let error_code = err.code();
        Self {
            code: error_code.code_string(),
            message: err.to_string(),
            error_code,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutinePatchReport {
    pub routine: RoutineName,
    pub path: Option<PathBuf>,
    pub status: RoutinePatchStatus,
    pub insertions: Vec<Insertion>,
    /// Objects removed, or that would be removed in a dry run.
    pub removed_objects: Vec<PathBuf>,
    /// Populated only when nothing was inserted.
    pub candidate_labels: Vec<CandidateLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RoutineFailure>,
    pub dry_run: bool,
}

/// Insert guards into one routine and invalidate its compiled objects.
///
/// Problems with this routine end up in the report so the caller can move on
/// to the next one.
pub fn patch_routine(
    vista: &VistaSettings,
    target: &RoutinePatch,
    dry_run: bool,
) -> RoutinePatchReport {
    let mut report = RoutinePatchReport {
        routine: target.routine.clone(),
        path: None,
        status: RoutinePatchStatus::NotFound,
        insertions: Vec::new(),
        removed_objects: Vec::new(),
        candidate_labels: Vec::new(),
        failure: None,
        dry_run,
    };

    let Some(path) = locate_routine(&vista.routines_dir, &target.routine) else {
        warn!(
            "{} not found under {}",
            target.routine.source_file(),
            vista.routines_dir.display()
        );
        return report;
    };
    info!("Patching {}", path.display());
    report.path = Some(path.clone());

    if let Err(err) = patch_located(vista, target, &path, &mut report) {
        warn!("Could not patch {}: {}", path.display(), err);
        report.status = RoutinePatchStatus::Failed;
        report.insertions.clear();
        report.removed_objects.clear();
        report.failure = Some(RoutineFailure::from(&err));
    }
    report
}

fn patch_located(
    vista: &VistaSettings,
    target: &RoutinePatch,
    path: &Path,
    report: &mut RoutinePatchReport,
) -> Result<(), PatchError> {
    let source = read_routine(path)?;
    let result = apply_label_patches(&source, &target.patches);

    if !result.is_modified() {
        report.status = RoutinePatchStatus::AlreadyPatched;
        report.candidate_labels = candidate_labels(&source, &target.patches);
        return Ok(());
    }

    report.insertions = result.insertions.clone();

    if report.dry_run {
        report.removed_objects = find_compiled_objects(&vista.home, &target.routine);
        report.status = RoutinePatchStatus::Patched;
        return Ok(());
    }

    report.removed_objects = commit_patch(path, &result.into_text(), || {
        remove_compiled_objects(&vista.home, &target.routine)
    })?;
    report.status = RoutinePatchStatus::Patched;
    info!(
        "Inserted {} guard(s) into {}",
        report.insertions.len(),
        path.display()
    );
    Ok(())
}

/// Invalidate compiled objects, then write the patched source.
///
/// A failed removal leaves the source untouched, so the next run still sees
/// pending insertions and retries the removal.
fn commit_patch<F>(
    path: &Path,
    text: &str,
    remove_objects: F,
) -> Result<Vec<PathBuf>, PatchError>
where
    F: FnOnce() -> Result<Vec<PathBuf>, PatchError>,
{
    let removed = remove_objects()?;
    write_routine(path, text)?;
    Ok(removed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkdirPatchStatus {
    Patched,
    AlreadyPatched,
    MarkerMissing,
    NotFound,
}

impl WorkdirPatchStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Patched | Self::AlreadyPatched)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkdirPatchReport {
    pub routine: RoutineName,
    pub path: PathBuf,
    pub status: WorkdirPatchStatus,
    pub old_marker: String,
    pub new_marker: String,
    pub occurrences: usize,
    pub removed_objects: Vec<PathBuf>,
    pub dry_run: bool,
}

/// Point the routine's temp-file path at `/tmp/`.
///
/// Stale objects in the configured object directories are removed first,
/// whether or not the source ends up changing.
pub fn patch_workdir(
    vista: &VistaSettings,
    settings: &WorkdirPatchSettings,
    dry_run: bool,
) -> Result<WorkdirPatchReport, PatchError> {
    let routine = RoutineName::new(settings.routine.as_str());
    let path = vista.routines_dir.join(routine.source_file());

    let removed_objects = if dry_run {
        objects_in_dirs(&vista.object_dirs, &routine)
    } else {
        remove_objects_in_dirs(&vista.object_dirs, &routine)?
    };

    let mut report = WorkdirPatchReport {
        routine,
        path: path.clone(),
        status: WorkdirPatchStatus::NotFound,
        old_marker: settings.old_marker.clone(),
        new_marker: settings.new_marker.clone(),
        occurrences: 0,
        removed_objects,
        dry_run,
    };

    if !path.is_file() {
        warn!("{} not found", path.display());
        return Ok(report);
    }

    let content = read_routine(&path)?;
    match plan_substitution(&content, &settings.old_marker, &settings.new_marker) {
        Substitution::AlreadyApplied => report.status = WorkdirPatchStatus::AlreadyPatched,
        Substitution::MarkerMissing => {
            warn!(
                "Marker {:?} not found in {}",
                settings.old_marker,
                path.display()
            );
            report.status = WorkdirPatchStatus::MarkerMissing;
        }
        Substitution::Replace {
            content,
            occurrences,
        } => {
            if !dry_run {
                write_routine(&path, &content)?;
                info!("Rewrote {} marker(s) in {}", occurrences, path.display());
            }
            report.occurrences = occurrences;
            report.status = WorkdirPatchStatus::Patched;
        }
    }
    Ok(report)
}
