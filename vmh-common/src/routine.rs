//! Routine source lookup and compiled-object invalidation.

use crate::errors::ErrorCode;
use glob::Pattern;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Routine identifier as it appears in the routine directory (`XUSRB`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RoutineName(String);

impl RoutineName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn upper(&self) -> String {
        self.0.to_uppercase()
    }

    /// Source file name (`XUSRB.m`).
    pub fn source_file(&self) -> String {
        format!("{}.m", self.0)
    }

    /// Compiled object file name (`XUSRB.o`).
    pub fn object_file(&self) -> String {
        format!("{}.o", self.0)
    }
}

impl fmt::Display for RoutineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised while reading, writing, or invalidating routines.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove {}: {source}", path.display())]
    RemoveObject {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::RoutineReadError,
            Self::Write { .. } => ErrorCode::RoutineWriteError,
            Self::RemoveObject { .. } => ErrorCode::RoutineObjectRemovalFailed,
        }
    }
}

/// Read routine source byte for byte.
///
/// M source is 8-bit text, so each byte maps to the char with the same value
/// and [`write_routine`] maps it back; bytes that are not valid UTF-8 survive
/// a patch unchanged.
pub fn read_routine(path: &Path) -> Result<String, PatchError> {
    let bytes = std::fs::read(path).map_err(|source| PatchError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_source(&bytes))
}

pub fn write_routine(path: &Path, content: &str) -> Result<(), PatchError> {
    std::fs::write(path, encode_source(content)).map_err(|source| PatchError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_source(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Inverse of [`decode_source`]. Chars above U+00FF can only come from
/// configured marker text and are written as UTF-8.
fn encode_source(content: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    for ch in content.chars() {
        match u8::try_from(ch) {
            Ok(byte) => out.push(byte),
            Err(_) => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out
}

/// Locate `<name>.m` under `root`.
///
/// Tries the name as given and upper-cased directly in `root`, then walks the
/// tree comparing file names case-insensitively.
pub fn locate_routine(root: &Path, name: &RoutineName) -> Option<PathBuf> {
    let escaped_root = Pattern::escape(&root.to_string_lossy());
    for candidate in [name.as_str().to_string(), name.upper()] {
        let pattern = format!("{}/{}.m", escaped_root, Pattern::escape(&candidate));
        let Ok(paths) = glob::glob(&pattern) else {
            continue;
        };
        if let Some(found) = paths.flatten().find(|p| p.is_file()) {
            debug!("Located {} at {}", name, found.display());
            return Some(found);
        }
    }

    let wanted = format!("{}.M", name.upper());
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| {
            entry.file_type().is_file()
                && entry.file_name().to_string_lossy().to_uppercase() == wanted
        })
        .map(|entry| entry.into_path())
}

/// Delete every `<NAME>.o` (any case) below `root`.
///
/// Unreadable directories are skipped; a failed delete is an error.
pub fn remove_compiled_objects(root: &Path, name: &RoutineName) -> Result<Vec<PathBuf>, PatchError> {
    let mut removed = Vec::new();
    for path in find_compiled_objects(root, name) {
        std::fs::remove_file(&path).map_err(|source| PatchError::RemoveObject {
            path: path.clone(),
            source,
        })?;
        info!("Removed stale object {}", path.display());
        removed.push(path);
    }
    Ok(removed)
}

/// Every `<NAME>.o` (any case) below `root`, without deleting anything.
pub fn find_compiled_objects(root: &Path, name: &RoutineName) -> Vec<PathBuf> {
    let wanted = format!("{}.O", name.upper());
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Skipping unreadable path during object scan: {}", err);
                None
            }
        })
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.file_name().to_string_lossy().to_uppercase() == wanted
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Existing `<dir>/<name>.o` files across fixed object directories.
pub fn objects_in_dirs(dirs: &[PathBuf], name: &RoutineName) -> Vec<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(name.object_file()))
        .filter(|path| path.exists())
        .collect()
}

/// Delete `<dir>/<name>.o` in each of `dirs` when present.
pub fn remove_objects_in_dirs(
    dirs: &[PathBuf],
    name: &RoutineName,
) -> Result<Vec<PathBuf>, PatchError> {
    let mut removed = Vec::new();
    for path in objects_in_dirs(dirs, name) {
        std::fs::remove_file(&path).map_err(|source| PatchError::RemoveObject {
            path: path.clone(),
            source,
        })?;
        info!("Deleted stale object {}", path.display());
        removed.push(path);
    }
    Ok(removed)
}
