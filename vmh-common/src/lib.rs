//! VistA Maintenance Helper - Common Library
//!
//! Shared configuration, error catalog, routine patch engine and exchange
//! file importer used by the `vmh` binary.

pub mod config;
pub mod errors;
pub mod import;
pub mod label_patch;
pub mod logging;
pub mod marker;
pub mod patcher;
pub mod routine;
pub mod shell;

pub use config::{LoadedConfig, VmhConfig, load_config};
pub use errors::{ErrorCategory, ErrorCode, ErrorEntry};
pub use import::{ExchangeFile, ImportError, ImportOutcome, ImportReport, Importer};
pub use label_patch::{LabelPatch, RoutinePatch, builtin_routine_patches};
pub use logging::{LogConfig, LogFormat, LoggingGuards, init_logging};
pub use patcher::{
    RoutineFailure, RoutinePatchReport, RoutinePatchStatus, WorkdirPatchReport,
    WorkdirPatchStatus, patch_routine, patch_workdir,
};
pub use routine::{PatchError, RoutineName};
pub use shell::{BashRunner, ShellRunner};
