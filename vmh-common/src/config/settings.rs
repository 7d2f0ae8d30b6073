//! Layered configuration: built-in defaults, optional TOML file, then
//! `VMH_*` environment overrides.

use super::env::{EnvError, EnvParser, expand_home};
use super::source::{ConfigSource, ConfigValueSource, Sourced};
use crate::errors::ErrorCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Upper bound for installer timeouts (one day).
const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct VmhConfig {
    pub vista: VistaSettings,
    pub import: ImportSettings,
    pub workdir_patch: WorkdirPatchSettings,
}

/// Layout of the VistA instance inside the container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VistaSettings {
    /// Instance owner's home; searched recursively for stale `.o` files.
    pub home: PathBuf,
    /// Root of the routine source tree.
    pub routines_dir: PathBuf,
    /// Shell script that exports the runtime environment.
    pub env_file: PathBuf,
    /// Per-architecture object directories checked by `patch-workdir`.
    pub object_dirs: Vec<PathBuf>,
    pub mumps_bin: String,
}

impl Default for VistaSettings {
    fn default() -> Self {
        Self {
            home: PathBuf::from("/home/vehu"),
            routines_dir: PathBuf::from("/home/vehu/r"),
            env_file: PathBuf::from("/home/vehu/etc/env"),
            object_dirs: vec![
                PathBuf::from("/home/vehu/r/r2.02_x86_64"),
                PathBuf::from("/home/vehu/s/r2.02_x86_64"),
                PathBuf::from("/home/vehu/p/r2.02_x86_64"),
            ],
            mumps_bin: "mumps".to_string(),
        }
    }
}

/// Exchange file import settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportSettings {
    pub prd_dir: PathBuf,
    /// MUMPS routine providing the `ALL` and `EN` entry points.
    pub routine: String,
    pub batch_timeout_secs: u64,
    pub file_timeout_secs: u64,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            prd_dir: PathBuf::from("/prd-files"),
            routine: "prdimport".to_string(),
            batch_timeout_secs: 600,
            file_timeout_secs: 300,
        }
    }
}

/// Marker substitution applied by `patch-workdir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkdirPatchSettings {
    pub routine: String,
    pub old_marker: String,
    pub new_marker: String,
}

impl Default for WorkdirPatchSettings {
    fn default() -> Self {
        Self {
            routine: "GMTSOBJ".to_string(),
            old_marker: "GMTSPATH=$$PWD^%ZISH".to_string(),
            new_marker: "GMTSPATH=\"/tmp/\"".to_string(),
        }
    }
}

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid environment configuration: {}", join_env_errors(.0))]
    Env(Vec<EnvError>),

    #[error("{key} = {value} in {} must be between 1 and {max}", path.display())]
    OutOfRange {
        path: PathBuf,
        key: &'static str,
        value: u64,
        max: u64,
    },
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::ConfigNotFound,
            Self::Read { .. } => ErrorCode::ConfigReadError,
            Self::Parse { .. } => ErrorCode::ConfigParseError,
            Self::Env(_) => ErrorCode::ConfigEnvError,
            Self::OutOfRange { .. } => ErrorCode::ConfigValueOutOfRange,
        }
    }
}

fn join_env_errors(errors: &[EnvError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Effective configuration plus provenance of every key.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: VmhConfig,
    /// Config file that was read, if any.
    pub path: Option<PathBuf>,
    pub sources: Vec<ConfigValueSource>,
}

/// Dotted keys in display order.
const KEYS: &[&str] = &[
    "vista.home",
    "vista.routines_dir",
    "vista.env_file",
    "vista.object_dirs",
    "vista.mumps_bin",
    "import.prd_dir",
    "import.routine",
    "import.batch_timeout_secs",
    "import.file_timeout_secs",
    "workdir_patch.routine",
    "workdir_patch.old_marker",
    "workdir_patch.new_marker",
];

/// Default per-user config location (`~/.config/vmh/config.toml` on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "vmh").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration.
///
/// An explicit path must exist. Without one, the default per-user path is
/// read only when present.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let path = match explicit {
        Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.is_file()),
    };

    let mut sources: HashMap<String, ConfigSource> = HashMap::new();
    let mut config = match &path {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let parsed = parse_config(&raw, path)?;
            for key in file_keys(&raw) {
                sources.insert(key, ConfigSource::File(path.clone()));
            }
            parsed
        }
        None => VmhConfig::default(),
    };

    apply_env_overrides(&mut config, &mut sources)?;
    check_file_timeouts(&config, &sources)?;

    let sources = KEYS
        .iter()
        .map(|key| ConfigValueSource {
            key: (*key).to_string(),
            value: display_value(&config, key),
            source: sources.remove(*key).unwrap_or(ConfigSource::Default),
        })
        .collect();

    Ok(LoadedConfig {
        config,
        path,
        sources,
    })
}

fn parse_config(raw: &str, path: &Path) -> Result<VmhConfig, ConfigError> {
    let mut config: VmhConfig = toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.vista.home = expand_path(&config.vista.home);
    config.vista.routines_dir = expand_path(&config.vista.routines_dir);
    config.vista.env_file = expand_path(&config.vista.env_file);
    config.import.prd_dir = expand_path(&config.import.prd_dir);
    Ok(config)
}

/// Timeouts read from the file get the same bounds the `VMH_*` parser applies.
fn check_file_timeouts(
    config: &VmhConfig,
    sources: &HashMap<String, ConfigSource>,
) -> Result<(), ConfigError> {
    let timeouts = [
        ("import.batch_timeout_secs", config.import.batch_timeout_secs),
        ("import.file_timeout_secs", config.import.file_timeout_secs),
    ];
    for (key, value) in timeouts {
        if (1..=MAX_TIMEOUT_SECS).contains(&value) {
            continue;
        }
        if let Some(ConfigSource::File(path)) = sources.get(key) {
            return Err(ConfigError::OutOfRange {
                path: path.clone(),
                key,
                value,
                max: MAX_TIMEOUT_SECS,
            });
        }
    }
    Ok(())
}

fn expand_path(path: &Path) -> PathBuf {
    expand_home(&path.to_string_lossy())
}

/// Dotted keys explicitly present in a (valid) TOML document.
fn file_keys(raw: &str) -> Vec<String> {
    let Ok(table) = toml::from_str::<toml::Table>(raw) else {
        return Vec::new();
    };
    let mut keys = Vec::new();
    for (section, value) in &table {
        if let Some(inner) = value.as_table() {
            keys.extend(inner.keys().map(|key| format!("{section}.{key}")));
        }
    }
    keys
}

fn record<T>(
    slot: &mut T,
    sourced: Sourced<T>,
    key: &str,
    sources: &mut HashMap<String, ConfigSource>,
) {
    if sourced.is_env() {
        *slot = sourced.value;
        sources.insert(key.to_string(), sourced.source);
    }
}

fn apply_env_overrides(
    config: &mut VmhConfig,
    sources: &mut HashMap<String, ConfigSource>,
) -> Result<(), ConfigError> {
    let mut parser = EnvParser::new();

    let home = parser.get_path("VISTA_HOME", &config.vista.home);
    record(&mut config.vista.home, home, "vista.home", sources);

    let routines = parser.get_path("ROUTINES_DIR", &config.vista.routines_dir);
    record(&mut config.vista.routines_dir, routines, "vista.routines_dir", sources);

    let env_file = parser.get_path("ENV_FILE", &config.vista.env_file);
    record(&mut config.vista.env_file, env_file, "vista.env_file", sources);

    let current_dirs = config
        .vista
        .object_dirs
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    let object_dirs = parser
        .get_string_list("OBJECT_DIRS", current_dirs)
        .map(|dirs| dirs.iter().map(|d| expand_home(d)).collect::<Vec<_>>());
    record(&mut config.vista.object_dirs, object_dirs, "vista.object_dirs", sources);

    let mumps = parser.get_string("MUMPS_BIN", &config.vista.mumps_bin);
    record(&mut config.vista.mumps_bin, mumps, "vista.mumps_bin", sources);

    let prd_dir = parser.get_path("PRD_DIR", &config.import.prd_dir);
    record(&mut config.import.prd_dir, prd_dir, "import.prd_dir", sources);

    let routine = parser.get_string("IMPORT_ROUTINE", &config.import.routine);
    record(&mut config.import.routine, routine, "import.routine", sources);

    let batch = parser.get_u64_range(
        "BATCH_TIMEOUT_SECS",
        config.import.batch_timeout_secs,
        1,
        MAX_TIMEOUT_SECS,
    );
    record(
        &mut config.import.batch_timeout_secs,
        batch,
        "import.batch_timeout_secs",
        sources,
    );

    let per_file = parser.get_u64_range(
        "FILE_TIMEOUT_SECS",
        config.import.file_timeout_secs,
        1,
        MAX_TIMEOUT_SECS,
    );
    record(
        &mut config.import.file_timeout_secs,
        per_file,
        "import.file_timeout_secs",
        sources,
    );

    if parser.has_errors() {
        return Err(ConfigError::Env(parser.take_errors()));
    }
    Ok(())
}

fn display_value(config: &VmhConfig, key: &str) -> String {
    match key {
        "vista.home" => config.vista.home.display().to_string(),
        "vista.routines_dir" => config.vista.routines_dir.display().to_string(),
        "vista.env_file" => config.vista.env_file.display().to_string(),
        "vista.object_dirs" => config
            .vista
            .object_dirs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(","),
        "vista.mumps_bin" => config.vista.mumps_bin.clone(),
        "import.prd_dir" => config.import.prd_dir.display().to_string(),
        "import.routine" => config.import.routine.clone(),
        "import.batch_timeout_secs" => config.import.batch_timeout_secs.to_string(),
        "import.file_timeout_secs" => config.import.file_timeout_secs.to_string(),
        "workdir_patch.routine" => config.workdir_patch.routine.clone(),
        "workdir_patch.old_marker" => config.workdir_patch.old_marker.clone(),
        "workdir_patch.new_marker" => config.workdir_patch.new_marker.clone(),
        _ => String::new(),
    }
}
