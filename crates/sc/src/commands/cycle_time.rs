//! `sc cycle-time` -- cycle-time report over a story search.

use std::fs::File;
use std::io::{self, BufWriter};

use anyhow::{Context, Result};
use shortcut_import::cycle_time::write_csv;
use shortcut_import::run_cycle_time;
use shortcut_import::slack::post_message;

use crate::cli::CycleTimeArgs;
use crate::context::RuntimeContext;
use crate::output::{output_json, render_bold, render_muted};

/// Execute the `sc cycle-time` command.
pub fn run(ctx: &RuntimeContext, args: &CycleTimeArgs) -> Result<()> {
    let config = ctx.load_config()?;
    let client = ctx.http_client(&config)?;
    let report = run_cycle_time(&client, &args.query)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_csv(&report.rows, BufWriter::new(file))?;
        }
        // In JSON mode the rows are part of the report on stdout.
        None if !ctx.json => write_csv(&report.rows, io::stdout().lock())?,
        None => {}
    }

    if let Some(webhook) = &args.slack_webhook {
        post_message(webhook, &report.summary.message(&args.query))?;
    }

    if ctx.json {
        output_json(&report);
    } else if let Some(path) = &args.output {
        println!(
            "{} {} of {} stories finished",
            render_bold("Cycle time:"),
            report.summary.count,
            report.searched
        );
        println!(
            "  mean {:.2}d, median {:.2}d, p85 {:.2}d",
            report.summary.mean, report.summary.median, report.summary.p85
        );
        println!("  {}", render_muted(&path.display().to_string()));
    }
    Ok(())
}
