//! Subcommand implementations for the `vmh` CLI.

pub mod config;
pub mod helpers;
pub mod import;
pub mod routines;
pub mod workdir;
