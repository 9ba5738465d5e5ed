//! `sc comments` / `sc delete-comments` -- external-id comments.

use anyhow::Result;
use shortcut_import::{run_add_comments, run_delete_comments};

use crate::cli::ApplyArgs;
use crate::context::RuntimeContext;
use crate::output::{format_failures, mode_heading, output_json};

/// Execute the `sc comments` command.
pub fn run_add(ctx: &RuntimeContext, args: &ApplyArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let group_id = config.require_group_id()?;
    let ledger = config.story_external_ids_csv();
    let report = ctx.with_api(&config, args.apply, |api| {
        run_add_comments(api, &ledger, group_id, args.apply)
    })??;

    if ctx.json {
        output_json(&report);
        return Ok(());
    }

    println!("{}", mode_heading("External-id comments", report.applied));
    println!("  stories: {}", report.total);
    println!("  needing a comment: {}", report.pending);
    if report.applied {
        println!("  posted: {}", report.posted);
        println!("{}", format_failures("failed", report.failed));
        println!(
            "Successfully processed {} out of {} stories",
            report.successful, report.total
        );
    }
    Ok(())
}

/// Execute the `sc delete-comments` command.
pub fn run_delete(ctx: &RuntimeContext, args: &ApplyArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let ledger = config.story_external_ids_csv();
    let report = ctx.with_api(&config, args.apply, |api| {
        run_delete_comments(api, &ledger, args.apply)
    })??;

    if ctx.json {
        output_json(&report);
        return Ok(());
    }

    println!("{}", mode_heading("Delete external-id comments", report.applied));
    println!("  comments recorded: {}", report.pending);
    if report.applied {
        println!("  deleted: {}", report.deleted);
        println!("{}", format_failures("failed", report.failed));
    }
    Ok(())
}
