//! `sc label` -- add a label to the stories matching a search.

use anyhow::Result;
use shortcut_import::run_add_label;

use crate::cli::LabelArgs;
use crate::context::RuntimeContext;
use crate::output::{mode_heading, output_json};

/// Execute the `sc label` command.
pub fn run(ctx: &RuntimeContext, args: &LabelArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let report = ctx.with_api(&config, args.apply, |api| {
        run_add_label(api, &args.name, &args.query, config.batch_size, args.apply)
    })??;

    if ctx.json {
        output_json(&report);
        return Ok(());
    }

    println!("{}", mode_heading(&format!("Label '{}'", report.label), report.applied));
    println!("  matched: {}", report.matched);
    println!("  already labeled: {}", report.already_labeled);
    println!(
        "  {}: {}",
        if report.applied { "labeled" } else { "to label" },
        report.targets.len()
    );
    Ok(())
}
