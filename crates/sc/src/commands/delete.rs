//! `sc delete` -- roll back an import from its ledger.

use anyhow::Result;
use shortcut_import::run_delete;

use crate::cli::ApplyArgs;
use crate::context::RuntimeContext;
use crate::output::{format_counts, format_failures, mode_heading, output_json, render_fail};

/// Execute the `sc delete` command.
pub fn run(ctx: &RuntimeContext, args: &ApplyArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let ledger = config.imported_entities_csv();
    let delay = config.delete_delay();
    let report = ctx.with_api(&config, args.apply, |api| {
        run_delete(api, &ledger, delay, args.apply)
    })??;

    if ctx.json {
        output_json(&report);
        return Ok(());
    }

    println!("{}", mode_heading("Delete imported entities", report.applied));
    println!("In ledger:");
    println!("{}", format_counts(&report.planned));
    if report.applied {
        println!("  deleted: {}", report.deleted);
        println!("  already gone: {}", report.already_gone);
        println!("{}", format_failures("failed", report.failed.len()));
        for failure in &report.failed {
            println!(
                "    {} {} {}",
                failure.entry.entity_type,
                failure.entry.id,
                render_fail(&failure.error)
            );
        }
    }
    Ok(())
}
