//! Error Catalog for VistA Maintenance Helper
//!
//! Every failure the CLI reports to an operator maps to a stable code in the
//! `VMH-Exxx` format, a one-line message, and a short list of remediation
//! steps.
//!
//! # Error Code Ranges
//!
//! | Range      | Category | Description                              |
//! |------------|----------|------------------------------------------|
//! | E001-E099  | Config   | Configuration file and environment       |
//! | E100-E199  | Routine  | Routine lookup, patching, object cleanup |
//! | E200-E299  | Import   | Exchange file discovery and installation |
//!
//! # Example
//!
//! ```rust
//! use vmh_common::errors::catalog::ErrorCode;
//!
//! let entry = ErrorCode::RoutineNotFound.entry();
//! println!("{}", entry.format_full());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code enumeration covering every reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    // =========================================================================
    // Config Errors (E001-E099)
    // =========================================================================
    /// Explicitly requested configuration file does not exist
    ConfigNotFound,
    /// Configuration file could not be read
    ConfigReadError,
    /// Configuration file contains invalid TOML
    ConfigParseError,
    /// Configuration file value outside its allowed range
    ConfigValueOutOfRange,
    /// Environment variable has invalid value
    ConfigEnvError,

    // =========================================================================
    // Routine Errors (E100-E199)
    // =========================================================================
    /// Routine source file could not be located
    RoutineNotFound,
    /// Routine source file could not be read
    RoutineReadError,
    /// Routine source file could not be written back
    RoutineWriteError,
    /// Expected marker text is absent from the routine
    RoutineMarkerMissing,
    /// Stale compiled object could not be removed
    RoutineObjectRemovalFailed,

    // =========================================================================
    // Import Errors (E200-E299)
    // =========================================================================
    /// Exchange file directory could not be scanned
    ImportScanFailed,
    /// Batch installer invocation failed
    ImportBatchFailed,
    /// Installer invocation timed out
    ImportTimeout,
    /// Installer process could not be started
    ImportSpawnFailed,
}

impl ErrorCode {
    /// Returns the numeric error code (without prefix).
    #[must_use]
    pub const fn code_number(&self) -> u16 {
        match self {
            Self::ConfigNotFound => 1,
            Self::ConfigReadError => 2,
            Self::ConfigParseError => 3,
            Self::ConfigValueOutOfRange => 4,
            Self::ConfigEnvError => 5,

            Self::RoutineNotFound => 100,
            Self::RoutineReadError => 101,
            Self::RoutineWriteError => 102,
            Self::RoutineMarkerMissing => 103,
            Self::RoutineObjectRemovalFailed => 104,

            Self::ImportScanFailed => 200,
            Self::ImportBatchFailed => 201,
            Self::ImportTimeout => 202,
            Self::ImportSpawnFailed => 203,
        }
    }

    /// Returns the formatted error code string (e.g., "VMH-E100").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("VMH-E{:03}", self.code_number())
    }

    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self.code_number() {
            1..=99 => ErrorCategory::Config,
            100..=199 => ErrorCategory::Routine,
            _ => ErrorCategory::Import,
        }
    }

    /// Returns the full error entry with all metadata.
    #[must_use]
    pub fn entry(&self) -> ErrorEntry {
        ErrorEntry {
            code: self.code_string(),
            category: self.category(),
            message: self.message().to_string(),
            remediation: self
                .remediation()
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::ConfigNotFound => "Configuration file not found",
            Self::ConfigReadError => "Failed to read configuration file",
            Self::ConfigParseError => "Configuration file contains invalid TOML syntax",
            Self::ConfigEnvError => "Environment variable has invalid value",
            Self::ConfigValueOutOfRange => "Configuration file value is out of range",

            Self::RoutineNotFound => "Routine source file not found",
            Self::RoutineReadError => "Failed to read routine source file",
            Self::RoutineWriteError => "Failed to write patched routine source file",
            Self::RoutineMarkerMissing => "Expected marker text not found in routine",
            Self::RoutineObjectRemovalFailed => "Failed to remove stale compiled object",

            Self::ImportScanFailed => "Failed to scan exchange file directory",
            Self::ImportBatchFailed => "Batch exchange file import reported failure",
            Self::ImportTimeout => "Installer invocation timed out",
            Self::ImportSpawnFailed => "Failed to start installer process",
        }
    }

    #[must_use]
    pub const fn remediation(&self) -> &'static [&'static str] {
        match self {
            Self::ConfigNotFound => &[
                "Check the path passed via --config or VMH_CONFIG",
                "Omit --config to run with built-in defaults",
            ],
            Self::ConfigReadError => &[
                "Check file permissions on the configuration file",
                "Run as the VistA instance owner (e.g. vehu)",
            ],
            Self::ConfigParseError => &[
                "Validate the file with a TOML linter",
                "Compare against the output of `vmh config`",
            ],
            Self::ConfigEnvError => &[
                "Check VMH_* environment variables for typos",
                "Timeouts must be whole seconds between 1 and 86400",
            ],
            Self::ConfigValueOutOfRange => &[
                "Timeouts must be whole seconds between 1 and 86400",
                "Fix the value in the file or override it with VMH_* variables",
            ],

            Self::RoutineNotFound => &[
                "Verify VMH_ROUTINES_DIR points at the instance routine directory",
                "Check that the routine exists in this VistA distribution",
            ],
            Self::RoutineReadError | Self::RoutineWriteError => &[
                "Run as the VistA instance owner (e.g. vehu)",
                "Check filesystem permissions on the routine directory",
            ],
            Self::RoutineMarkerMissing => &[
                "The routine may differ from the expected patch level",
                "Inspect the routine source and patch manually if required",
            ],
            Self::RoutineObjectRemovalFailed => &[
                "Delete the listed .o file manually so the runtime recompiles the routine",
            ],

            Self::ImportScanFailed => &[
                "Verify VMH_PRD_DIR exists and is readable",
            ],
            Self::ImportBatchFailed => &[
                "Review the installer STDOUT/STDERR printed above",
                "Individual files are retried automatically",
            ],
            Self::ImportTimeout => &[
                "Raise VMH_BATCH_TIMEOUT_SECS or VMH_FILE_TIMEOUT_SECS",
                "Check whether the MUMPS process is blocked on a lock",
            ],
            Self::ImportSpawnFailed => &[
                "Verify bash and the MUMPS binary are on PATH",
                "Verify VMH_ENV_FILE points at the instance environment script",
            ],
        }
    }

    /// Returns all error codes.
    #[must_use]
    pub const fn all() -> &'static [ErrorCode] {
        &[
            Self::ConfigNotFound,
            Self::ConfigReadError,
            Self::ConfigParseError,
            Self::ConfigValueOutOfRange,
            Self::ConfigEnvError,
            Self::RoutineNotFound,
            Self::RoutineReadError,
            Self::RoutineWriteError,
            Self::RoutineMarkerMissing,
            Self::RoutineObjectRemovalFailed,
            Self::ImportScanFailed,
            Self::ImportBatchFailed,
            Self::ImportTimeout,
            Self::ImportSpawnFailed,
        ]
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code_string(), self.message())
    }
}

/// Error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Configuration file and environment errors (E001-E099)
    Config,
    /// Routine lookup and patching errors (E100-E199)
    Routine,
    /// Exchange file import errors (E200-E299)
    Import,
}

impl ErrorCategory {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Config => "Configuration",
            Self::Routine => "Routine",
            Self::Import => "Import",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Complete error entry with all metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Error code string (e.g., "VMH-E100")
    pub code: String,
    pub category: ErrorCategory,
    pub message: String,
    /// Steps to remediate the error
    pub remediation: Vec<String>,
}

impl ErrorEntry {
    /// Formats the error for display with full remediation steps.
    #[must_use]
    pub fn format_full(&self) -> String {
        let mut output = format!("[{}] {}\n", self.code, self.message);

        if !self.remediation.is_empty() {
            output.push_str("Remediation steps:\n");
            for (i, step) in self.remediation.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, step));
            }
        }

        output
    }

    /// Formats the error as a single line.
    #[must_use]
    pub fn format_brief(&self) -> String {
        format!("[{}] {}", self.code, self.message)
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_brief())
    }
}
