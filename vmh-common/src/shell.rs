//! Shell invocation with a hard timeout, plus quoting helpers for the
//! installer command template.

use serde::Serialize;
use std::borrow::Cow;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished shell script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Runs a shell script to completion or until the timeout elapses.
pub trait ShellRunner {
    fn run(
        &self,
        script: &str,
        cwd: &Path,
        timeout: Duration,
    ) -> impl Future<Output = Result<CommandOutput, RunError>> + Send;
}

/// `bash -c <script>`; the child is killed when the timeout fires.
#[derive(Debug, Clone)]
pub struct BashRunner {
    shell: String,
}

impl BashRunner {
    pub fn new() -> Self {
        Self {
            shell: "bash".to_string(),
        }
    }
}

impl Default for BashRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellRunner for BashRunner {
    async fn run(
        &self,
        script: &str,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, RunError> {
        debug!("Running in {}: {}", cwd.display(), script);

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(script)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(timeout, cmd.output()).await {
            Err(_) => Err(RunError::Timeout(timeout)),
            Ok(Err(source)) => Err(RunError::Spawn {
                program: self.shell.clone(),
                source,
            }),
            Ok(Ok(output)) => Ok(CommandOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
        }
    }
}

/// Quote a value for POSIX shells.
pub fn shell_quote(value: &str) -> String {
    shell_escape::unix::escape(Cow::Borrowed(value)).into_owned()
}

/// Render a value as a MUMPS string literal (embedded quotes doubled).
pub fn m_string(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
