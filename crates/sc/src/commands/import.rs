//! `sc import` -- import the Pivotal Tracker export.

use anyhow::Result;
use shortcut_import::run_import;

use crate::cli::ApplyArgs;
use crate::context::RuntimeContext;
use crate::output::{format_counts, format_failures, mode_heading, output_json, render_muted};

/// Execute the `sc import` command.
pub fn run(ctx: &RuntimeContext, args: &ApplyArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let report = ctx.with_api(&config, args.apply, |api| run_import(&config, api, args.apply))??;

    if ctx.json {
        output_json(&report);
        return Ok(());
    }

    println!("{}", mode_heading("Pivotal import", report.applied));
    println!("Run label: {}", report.run_label);
    if let Some(url) = &report.run_label_url {
        println!("  {}", render_muted(url));
    }
    println!("Planned:");
    println!("{}", format_counts(&report.planned));
    println!("Created:");
    println!("{}", format_counts(&report.created));
    println!("{}", format_failures("invalid rows", report.invalid_rows));
    println!("{}", format_failures("failed stories", report.failed_stories));
    println!("{}", format_failures("failed files", report.failed_files));
    if report.applied {
        println!(
            "Ledger: {}",
            render_muted(&config.imported_entities_csv().display().to_string())
        );
    }
    Ok(())
}
