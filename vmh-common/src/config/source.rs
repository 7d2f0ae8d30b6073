//! Source tracking for configuration values.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "origin")]
pub enum ConfigSource {
    /// Built-in default.
    Default,
    /// Loaded from a TOML configuration file.
    File(PathBuf),
    /// Overridden by an environment variable.
    Environment(String),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::File(path) => write!(f, "file ({})", path.display()),
            Self::Environment(var) => write!(f, "env ({})", var),
        }
    }
}

/// A value paired with its source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> Sourced<T> {
    pub fn default_value(value: T) -> Self {
        Self {
            value,
            source: ConfigSource::Default,
        }
    }

    pub fn from_env(value: T, var_name: impl Into<String>) -> Self {
        Self {
            value,
            source: ConfigSource::Environment(var_name.into()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        Sourced {
            value: f(self.value),
            source: self.source,
        }
    }

    /// True when an environment variable supplied the value.
    pub fn is_env(&self) -> bool {
        matches!(self.source, ConfigSource::Environment(_))
    }
}

/// Source record for a single dotted configuration key (e.g. `import.prd_dir`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigValueSource {
    pub key: String,
    pub value: String,
    pub source: ConfigSource,
}
