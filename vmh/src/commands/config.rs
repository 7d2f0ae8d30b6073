//! `vmh config`: show the effective configuration and where each value came from.

use super::helpers::print_json;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use vmh_common::config::{ConfigValueSource, default_config_path};
use vmh_common::LoadedConfig;

#[derive(Serialize)]
struct ConfigShow<'a> {
    file: Option<&'a PathBuf>,
    default_file: Option<PathBuf>,
    values: &'a [ConfigValueSource],
}

pub fn run(loaded: &LoadedConfig, json: bool) -> Result<ExitCode> {
    let show = ConfigShow {
        file: loaded.path.as_ref(),
        default_file: default_config_path(),
        values: &loaded.sources,
    };

    if json {
        print_json(&show)?;
        return Ok(ExitCode::SUCCESS);
    }

    match show.file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none)"),
    }
    if let Some(default) = &show.default_file {
        println!("Default location: {}", default.display());
    }
    println!();

    let width = show.values.iter().map(|v| v.key.len()).max().unwrap_or(0);
    for value in show.values {
        println!(
            "{:width$} = {}  {}",
            value.key,
            value.value,
            format!("[{}]", value.source).dimmed()
        );
    }
    Ok(ExitCode::SUCCESS)
}
