//! Output formatting helpers for the `sc` CLI.
//!
//! Reports go to stdout, either as pretty JSON or as a short colored
//! summary. Progress logging goes to stderr through `tracing`.

use std::env;
use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use shortcut_import::collector::EntityCounts;

// Ayu Dark palette
const PASS: (u8, u8, u8) = (0xc2, 0xd9, 0x4c);
const WARN: (u8, u8, u8) = (0xff, 0xb4, 0x54);
const FAIL: (u8, u8, u8) = (0xf0, 0x71, 0x78);
const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80);

pub const ICON_PASS: &str = "\u{2713}";
pub const ICON_WARN: &str = "\u{26A0}";
pub const ICON_FAIL: &str = "\u{2716}";

/// Determines if ANSI color codes should be used.
///
/// `NO_COLOR` disables color, `CLICOLOR_FORCE` forces it, otherwise color
/// is used only when stdout is a terminal.
pub fn supports_color() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if env::var("TERM").as_deref() == Ok("dumb") {
        return false;
    }
    if env::var_os("CLICOLOR_FORCE").is_some() {
        return true;
    }
    io::stdout().is_terminal()
}

fn color_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        s.to_string()
    }
}

pub fn render_pass(s: &str) -> String {
    color_str(s, PASS)
}

pub fn render_warn(s: &str) -> String {
    color_str(s, WARN)
}

pub fn render_fail(s: &str) -> String {
    color_str(s, FAIL)
}

pub fn render_muted(s: &str) -> String {
    color_str(s, MUTED)
}

pub fn render_bold(s: &str) -> String {
    if supports_color() {
        s.bold().to_string()
    } else {
        s.to_string()
    }
}

/// Print a value as pretty-printed JSON to stdout.
///
/// Terminates the process with exit code 1 if serialization fails.
pub fn output_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Ignore broken pipe errors (e.g., piped to `head`)
            let _ = writeln!(handle, "{}", json);
        }
        Err(e) => {
            eprintln!("Error: failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Heading naming the mode a workflow ran in.
pub fn mode_heading(title: &str, applied: bool) -> String {
    if applied {
        format!("{} {}", render_pass(ICON_PASS), render_bold(title))
    } else {
        format!(
            "{} {} {}",
            render_warn(ICON_WARN),
            render_bold(title),
            render_warn("(dry run: re-run with --apply to make changes)")
        )
    }
}

/// One indented line per entity type, or a muted "none".
pub fn format_counts(counts: &EntityCounts) -> String {
    if counts.0.is_empty() {
        return format!("  {}", render_muted("none"));
    }
    counts
        .0
        .iter()
        .map(|(entity_type, n)| format!("  {:<10} {}", entity_type.as_str(), n))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `"  label: n"`, colored as a failure when `n > 0`.
pub fn format_failures(label: &str, n: usize) -> String {
    if n == 0 {
        format!("  {}: {}", label, n)
    } else {
        format!("  {} {}: {}", render_fail(ICON_FAIL), label, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortcut_core::entity::EntityType;

    #[test]
    fn counts_are_listed_per_type() {
        let mut counts = EntityCounts::default();
        counts.add(EntityType::Story, 3);
        counts.add(EntityType::Epic, 1);
        assert_eq!(format_counts(&counts), "  story      3\n  epic       1");
        assert!(format_counts(&EntityCounts::default()).contains("none"));
        assert_eq!(format_failures("failed", 0), "  failed: 0");
    }
}
