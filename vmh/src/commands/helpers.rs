//! Shared helper functions for VMH commands.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use vmh_common::ErrorCode;

/// Indent each line of text with a given prefix.
pub fn indent_lines(text: &str, prefix: &str) -> String {
    let mut out = String::new();
    for (idx, line) in text.lines().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(prefix);
        out.push_str(line);
    }
    out
}

/// Pretty-print a report as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    println!("{rendered}");
    Ok(())
}

/// Print a catalog entry for a failure, with the underlying detail.
pub fn report_error(code: ErrorCode, detail: &str) {
    let entry = code.entry();
    eprintln!("{} {}", "error:".red().bold(), detail);
    eprint!("{}", entry.format_full());
}

/// One-line catalog reference on stderr for a non-fatal problem.
pub fn report_brief(code: ErrorCode) {
    eprintln!("{}", code.entry().format_brief().dimmed());
}

/// Colour a status word the way operators scan for it.
pub fn status_word(word: &str) -> String {
    match word {
        "SUCCESS" => word.green().to_string(),
        "WARNING" | "TIMEOUT" => word.yellow().to_string(),
        "ERROR" => word.red().to_string(),
        _ => word.to_string(),
    }
}
