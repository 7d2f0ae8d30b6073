//! Exchange file (`.PRD`) import through the instance's installer routine.
//!
//! One batch invocation installs every file in the directory. If it fails,
//! each file is installed individually, once.

use crate::config::{ImportSettings, VistaSettings};
use crate::errors::ErrorCode;
use crate::shell::{RunError, ShellRunner, m_string, shell_quote};
use glob::{MatchOptions, Pattern};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Extension of exchange files, matched case-insensitively.
pub const EXCHANGE_EXTENSION: &str = "prd";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid scan pattern for {}: {source}", dir.display())]
    Scan {
        dir: PathBuf,
        #[source]
        source: glob::PatternError,
    },
}

impl ImportError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Scan { .. } => ErrorCode::ImportScanFailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

/// Regular files directly in `dir` with a `.prd` extension (any case),
/// sorted by path. Hidden files are skipped and a missing directory yields
/// no files.
pub fn discover_exchange_files(dir: &Path) -> Result<Vec<ExchangeFile>, ImportError> {
    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(&dir.to_string_lossy()),
        EXCHANGE_EXTENSION
    );
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_leading_dot: true,
        ..MatchOptions::default()
    };
    let paths = glob::glob_with(&pattern, options).map_err(|source| ImportError::Scan {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut unique = BTreeSet::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => {
                unique.insert(path);
            }
            Ok(_) => {}
            Err(err) => warn!("Skipping unreadable entry in {}: {}", dir.display(), err),
        }
    }

    Ok(unique
        .into_iter()
        .map(|path| {
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ExchangeFile { path, name, size }
        })
        .collect())
}

fn with_trailing_slash(dir: &Path) -> String {
    let dir = dir.to_string_lossy();
    if dir.ends_with('/') {
        dir.into_owned()
    } else {
        format!("{dir}/")
    }
}

fn installer_script(vista: &VistaSettings, m_command: &str) -> String {
    format!(
        "source {} && {} -run %XCMD {}",
        shell_quote(&vista.env_file.to_string_lossy()),
        shell_quote(&vista.mumps_bin),
        shell_quote(m_command)
    )
}

/// Script installing every exchange file in `dir`.
pub fn batch_script(vista: &VistaSettings, import: &ImportSettings, dir: &Path) -> String {
    let m_command = format!(
        "D ALL^{}({})",
        import.routine,
        m_string(&with_trailing_slash(dir))
    );
    installer_script(vista, &m_command)
}

/// Script installing a single exchange file.
pub fn single_file_script(
    vista: &VistaSettings,
    import: &ImportSettings,
    file: &ExchangeFile,
) -> String {
    let parent = file.path.parent().unwrap_or_else(|| Path::new("/"));
    let m_command = format!(
        "D EN^{}({},{})",
        import.routine,
        m_string(&with_trailing_slash(parent)),
        m_string(&file.name)
    );
    installer_script(vista, &m_command)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Success,
    /// Installer ran but exited non-zero.
    Warning,
    Timeout { after_secs: u64 },
    /// Installer could not be started.
    Error { message: String },
}

impl ImportOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Error { .. } => "ERROR",
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Success | Self::Warning => None,
            Self::Timeout { .. } => Some(ErrorCode::ImportTimeout),
            Self::Error { .. } => Some(ErrorCode::ImportSpawnFailed),
        }
    }
}

/// One installer invocation and what it printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub script: String,
    pub outcome: ImportOutcome,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Invocation {
    fn from_run(script: String, result: Result<crate::shell::CommandOutput, RunError>) -> Self {
        match result {
            Ok(output) => Self {
                script,
                outcome: if output.success() {
                    ImportOutcome::Success
                } else {
                    ImportOutcome::Warning
                },
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            },
            Err(RunError::Timeout(after)) => Self {
                script,
                outcome: ImportOutcome::Timeout {
                    after_secs: after.as_secs(),
                },
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
            },
            Err(err @ RunError::Spawn { .. }) => Self {
                script,
                outcome: ImportOutcome::Error {
                    message: err.to_string(),
                },
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
            },
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == ImportOutcome::Success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileImport {
    pub file: String,
    pub invocation: Invocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub dir: PathBuf,
    pub files: Vec<ExchangeFile>,
    /// `None` when no files were found or in a dry run.
    pub batch: Option<Invocation>,
    pub fallback: Vec<FileImport>,
    /// Scripts that would run, populated only in a dry run.
    pub planned: Vec<String>,
    pub dry_run: bool,
}

impl ImportReport {
    pub fn fell_back(&self) -> bool {
        !self.fallback.is_empty()
    }
}

/// Drives the batch-then-fallback import.
pub struct Importer<R> {
    runner: R,
    vista: VistaSettings,
    import: ImportSettings,
}

impl<R: ShellRunner> Importer<R> {
    pub fn new(runner: R, vista: VistaSettings, import: ImportSettings) -> Self {
        Self {
            runner,
            vista,
            import,
        }
    }

    pub async fn run(&self, dry_run: bool) -> Result<ImportReport, ImportError> {
        let dir = self.import.prd_dir.clone();
        let files = discover_exchange_files(&dir)?;
        let mut report = ImportReport {
            dir: dir.clone(),
            files,
            batch: None,
            fallback: Vec::new(),
            planned: Vec::new(),
            dry_run,
        };

        if report.files.is_empty() {
            info!("No exchange files in {}", dir.display());
            return Ok(report);
        }

        let batch = batch_script(&self.vista, &self.import, &dir);
        if dry_run {
            report.planned.push(batch);
            report.planned.extend(
                report
                    .files
                    .iter()
                    .map(|file| single_file_script(&self.vista, &self.import, file)),
            );
            return Ok(report);
        }

        info!("Installing {} exchange file(s) in one batch", report.files.len());
        let timeout = Duration::from_secs(self.import.batch_timeout_secs);
        let result = self.runner.run(&batch, &self.vista.home, timeout).await;
        let batch = Invocation::from_run(batch, result);
        let batch_ok = batch.succeeded();
        report.batch = Some(batch);

        if batch_ok {
            return Ok(report);
        }

        warn!("Batch import failed; retrying files individually");
        let timeout = Duration::from_secs(self.import.file_timeout_secs);
        for file in &report.files {
            let script = single_file_script(&self.vista, &self.import, file);
            let result = self.runner.run(&script, &self.vista.home, timeout).await;
            let invocation = Invocation::from_run(script, result);
            info!("{}: {}", file.name, invocation.outcome.label());
            report.fallback.push(FileImport {
                file: file.name.clone(),
                invocation,
            });
        }
        Ok(report)
    }
}
