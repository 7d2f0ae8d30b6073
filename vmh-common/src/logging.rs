//! Process-wide tracing setup shared by the binaries.
//!
//! Diagnostics always go to a terminal stream (stderr for the CLI) and,
//! when `VMH_LOG_DIR` is set, to a daily-rotated file as well.

use crate::config::EnvParser;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    /// Write terminal output to stderr instead of stdout.
    pub stderr: bool,
    pub file_dir: Option<PathBuf>,
    /// Problems found while reading the environment, reported once logging is up.
    warnings: Vec<String>,
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::Pretty,
            stderr: false,
            file_dir: None,
            warnings: Vec::new(),
        }
    }

    /// Read `VMH_LOG_LEVEL`, `VMH_LOG_FORMAT` and `VMH_LOG_DIR`.
    pub fn from_env(default_level: &str) -> Self {
        let mut parser = EnvParser::new();
        let level = parser.get_log_level("LOG_LEVEL", default_level).value;
        let format = parser.get_optional_string("LOG_FORMAT").value;
        let file_dir = parser.get_optional_string("LOG_DIR").value;

        let mut config = Self::new(level);
        config.warnings = parser
            .take_errors()
            .into_iter()
            .map(|err| err.to_string())
            .collect();

        if let Some(raw) = format {
            match LogFormat::parse(&raw) {
                Some(format) => config.format = format,
                None => config
                    .warnings
                    .push(format!("Unknown VMH_LOG_FORMAT {raw:?}, using pretty")),
            }
        }
        config.file_dir = file_dir.map(|dir| crate::config::env::expand_home(&dir));
        config
    }

    pub fn with_stderr(mut self) -> Self {
        self.stderr = true;
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Keeps the non-blocking file writer flushing until dropped.
#[must_use = "dropping the guards stops file logging"]
pub struct LoggingGuards {
    _file: Option<WorkerGuard>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn terminal_layer(config: &LogConfig) -> BoxedLayer {
    let layer = fmt::layer().with_target(false);
    match (config.format, config.stderr) {
        (LogFormat::Pretty, true) => layer.with_writer(std::io::stderr).boxed(),
        (LogFormat::Pretty, false) => layer.with_writer(std::io::stdout).boxed(),
        (LogFormat::Json, true) => layer.json().with_writer(std::io::stderr).boxed(),
        (LogFormat::Json, false) => layer.json().with_writer(std::io::stdout).boxed(),
    }
}

/// Install the global subscriber.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuards> {
    let filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("Invalid log filter {:?}", config.level))?;

    let mut layers: Vec<BoxedLayer> = vec![terminal_layer(config)];
    let mut file_guard = None;

    if let Some(dir) = &config.file_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(dir, "vmh.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
        file_guard = Some(guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }

    Ok(LoggingGuards { _file: file_guard })
}
