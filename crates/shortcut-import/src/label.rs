//! Adding a label to every story matching a search.

use serde::Serialize;
use shortcut_api::ShortcutApi;
use shortcut_core::payload::{BulkLabelUpdate, LabelRef};
use tracing::info;

use crate::error::Result;

/// Outcome of `sc label`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelReport {
    pub applied: bool,
    pub label: String,
    pub matched: usize,
    pub already_labeled: usize,
    /// Stories that got (or in a dry run, would get) the label.
    pub targets: Vec<i64>,
    /// Number of bulk update requests sent.
    pub batches: usize,
}

/// Adds `label` to the stories matching `query` that lack it, sending at
/// most `batch_size` story ids per request.
pub fn run_add_label(
    api: &dyn ShortcutApi,
    label: &str,
    query: &str,
    batch_size: usize,
    apply: bool,
) -> Result<LabelReport> {
    info!("Running in {} mode", if apply { "APPLY" } else { "DRY RUN" });
    info!("Searching stories: {}", query);
    let stories = api.search_stories(query)?;

    let mut report = LabelReport {
        applied: apply,
        label: label.to_string(),
        matched: stories.len(),
        ..Default::default()
    };
    for story in &stories {
        if story.has_label(label) {
            report.already_labeled += 1;
        } else {
            report.targets.push(story.id);
        }
    }
    info!(
        "{} stories matched, {} already labeled '{}', {} to update",
        report.matched,
        report.already_labeled,
        label,
        report.targets.len()
    );

    if !apply {
        for story in stories.iter().filter(|s| report.targets.contains(&s.id)) {
            info!("[DRY RUN] would label story {} '{}'", story.id, story.name);
        }
        return Ok(report);
    }

    for chunk in report.targets.chunks(batch_size.max(1)) {
        let updated = api.add_labels(&BulkLabelUpdate {
            story_ids: chunk.to_vec(),
            labels_add: vec![LabelRef::new(label)],
        })?;
        report.batches += 1;
        info!("Labeled {} stories", updated.len());
    }
    Ok(report)
}
