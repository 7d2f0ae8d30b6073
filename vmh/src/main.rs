//! VistA Maintenance Helper
//!
//! Installs reminder exchange files and applies source patches to Kernel and
//! Health Summary routines inside a VistA container.

#![forbid(unsafe_code)]

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::helpers::report_error;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use vmh_common::config::ConfigError;
use vmh_common::{ImportError, LogConfig, PatchError, init_logging, load_config};

#[derive(Parser)]
#[command(name = "vmh")]
#[command(author, version, about = "VistA maintenance helper - PRD import and routine patching")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = "VMH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install every PRD exchange file, falling back to one file at a time
    Import {
        /// Directory to scan instead of the configured one
        #[arg(long)]
        dir: Option<PathBuf>,

        /// List files and commands without running the installer
        #[arg(long)]
        dry_run: bool,
    },

    /// Replace the working-directory lookup in GMTSOBJ with /tmp/
    PatchWorkdir {
        /// Report what would change without writing or deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Guard undefined Kernel variables in XUSRB and XUS1
    PatchRoutines {
        /// Patch only this routine
        #[arg(long, value_name = "NAME")]
        routine: Option<String>,

        /// Report what would change without writing or deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the effective configuration and value sources
    Config,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env("info").with_stderr();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let _logging_guards = init_logging(&log_config)?;

    if cli.json || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let loaded = match load_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(err) => {
            report_error(err.code(), &err.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };
    if let Some(path) = &loaded.path {
        debug!("Using configuration file {}", path.display());
    }
    let config = &loaded.config;

    let outcome = match cli.command {
        Commands::Import { dir, dry_run } => {
            commands::import::run(config, dir, dry_run, cli.json).await
        }
        Commands::PatchWorkdir { dry_run } => commands::workdir::run(config, dry_run, cli.json),
        Commands::PatchRoutines { routine, dry_run } => {
            commands::routines::run(config, routine.as_deref(), dry_run, cli.json)
        }
        Commands::Config => commands::config::run(&loaded, cli.json),
    };

    match outcome {
        Ok(code) => Ok(code),
        Err(err) => {
            report_failure(&err);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Print library failures with their catalog entry; anything else plainly.
fn report_failure(err: &anyhow::Error) {
    let code = if let Some(e) = err.downcast_ref::<PatchError>() {
        Some(e.code())
    } else if let Some(e) = err.downcast_ref::<ImportError>() {
        Some(e.code())
    } else {
        err.downcast_ref::<ConfigError>().map(ConfigError::code)
    };

    match code {
        Some(code) => report_error(code, &format!("{err:#}")),
        None => eprintln!("Error: {err:#}"),
    }
}
