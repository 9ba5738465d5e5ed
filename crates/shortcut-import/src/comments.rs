//! External-id comments: writing "Pivotal Tracker Id N" onto imported
//! stories, and removing those comments again.
//!
//! Progress is kept in `story_external_ids.csv`, so both workflows can be
//! re-run and only touch rows that still need work.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use shortcut_api::ShortcutApi;
use shortcut_core::entity::StorySummary;
use shortcut_core::marker::external_id_comment;
use tracing::{error, info};

use crate::error::{ImportError, Result};
use crate::ledger::write_csv_atomic;

pub const EXTERNAL_ID_HEADER: [&str; 6] = [
    "id",
    "external_id",
    "comment_created_at",
    "comment_id",
    "success",
    "error",
];

/// One story of the external-id ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalIdRow {
    /// Shortcut story id.
    pub id: i64,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub comment_created_at: String,
    #[serde(default)]
    pub comment_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: String,
}

impl ExternalIdRow {
    pub fn from_story(story: &StorySummary) -> Self {
        Self {
            id: story.id,
            external_id: story.external_id.clone().unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Has an external id and no successful comment yet.
    pub fn needs_comment(&self) -> bool {
        !self.external_id.trim().is_empty() && self.success != Some(true)
    }

    /// Carries a comment this tool created.
    pub fn has_comment(&self) -> bool {
        self.success == Some(true) && self.comment_id.is_some()
    }

    fn reset_comment(&mut self) {
        self.comment_created_at.clear();
        self.comment_id = None;
        self.success = None;
        self.error.clear();
    }
}

/// Accepts `true`/`false` in any case (older ledgers wrote `True`), and
/// treats an empty cell as "not attempted".
fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(
        match raw.as_deref().map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("true") | Some("1") => Some(true),
            Some("false") | Some("0") => Some(false),
            _ => None,
        },
    )
}

pub fn load_external_ids(path: &Path) -> Result<Vec<ExternalIdRow>> {
    if !path.exists() {
        return Err(ImportError::MissingLedger {
            path: path.to_path_buf(),
        });
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| ImportError::csv(path, e))?;
    reader
        .deserialize()
        .map(|row| row.map_err(|e| ImportError::csv(path, e)))
        .collect()
}

pub fn save_external_ids(path: &Path, rows: &[ExternalIdRow]) -> Result<()> {
    write_csv_atomic(path, &EXTERNAL_ID_HEADER, rows)
}

// ---------------------------------------------------------------------------
// Adding comments
// ---------------------------------------------------------------------------

/// Outcome of `sc comments`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommentsReport {
    pub applied: bool,
    pub total: usize,
    /// Rows that needed a comment at the start of the run.
    pub pending: usize,
    pub posted: usize,
    pub failed: usize,
    /// Rows with a successful comment after the run.
    pub successful: usize,
}

/// Adds the external-id comment to every imported story lacking one.
///
/// When the ledger does not exist it is seeded from the team's stories.
/// Without `apply` nothing is posted and nothing is written.
pub fn run_add_comments(
    api: &dyn ShortcutApi,
    ledger_path: &Path,
    group_id: &str,
    apply: bool,
) -> Result<CommentsReport> {
    info!("Running in {} mode", if apply { "APPLY" } else { "DRY RUN" });

    let mut rows = if ledger_path.exists() {
        load_external_ids(ledger_path)?
    } else {
        info!("Fetching stories for group {}...", group_id);
        let stories = api.group_stories(group_id)?;
        if stories.is_empty() {
            info!("No stories found in group {}", group_id);
            return Ok(CommentsReport {
                applied: apply,
                ..Default::default()
            });
        }
        let rows: Vec<ExternalIdRow> = stories.iter().map(ExternalIdRow::from_story).collect();
        if apply {
            save_external_ids(ledger_path, &rows)?;
            info!(
                "Created {} with {} stories",
                ledger_path.display(),
                rows.len()
            );
        }
        rows
    };

    let mut report = CommentsReport {
        applied: apply,
        total: rows.len(),
        pending: rows.iter().filter(|r| r.needs_comment()).count(),
        ..Default::default()
    };

    let mut rejected = None;
    for row in rows.iter_mut().filter(|r| r.needs_comment()) {
        let text = external_id_comment(row.external_id.trim());
        if !apply {
            info!("[DRY RUN] would comment on story {}: {}", row.id, text);
            continue;
        }

        info!("Adding comment to story {}...", row.id);
        match api.create_story_comment(row.id, &text) {
            Ok(comment) => {
                row.comment_created_at = comment.created_at.to_rfc3339();
                row.comment_id = Some(comment.id);
                row.success = Some(true);
                row.error.clear();
                report.posted += 1;
            }
            Err(e) if e.is_unauthorized() => {
                rejected = Some(e);
                break;
            }
            Err(e) => {
                error!("Failed to comment on story {}: {}", row.id, e);
                row.comment_created_at.clear();
                row.comment_id = None;
                row.success = Some(false);
                row.error = e.to_string();
                report.failed += 1;
            }
        }
    }

    // Keep the comments already posted so a re-run skips them.
    if let Some(e) = rejected {
        save_external_ids(ledger_path, &rows)?;
        return Err(e.into());
    }

    report.successful = rows.iter().filter(|r| r.success == Some(true)).count();
    if apply {
        save_external_ids(ledger_path, &rows)?;
        info!(
            "Processing complete. Successfully processed {} out of {} stories.",
            report.successful, report.total
        );
    } else {
        info!(
            "Dry run: {} of {} stories would get a comment. Re-run with --apply to post.",
            report.pending, report.total
        );
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Deleting comments
// ---------------------------------------------------------------------------

/// Outcome of `sc delete-comments`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeleteCommentsReport {
    pub applied: bool,
    pub total: usize,
    /// Rows carrying a comment at the start of the run.
    pub pending: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Deletes every external-id comment recorded in the ledger.
///
/// A comment that is already gone counts as deleted.
pub fn run_delete_comments(
    api: &dyn ShortcutApi,
    ledger_path: &Path,
    apply: bool,
) -> Result<DeleteCommentsReport> {
    info!("Running in {} mode", if apply { "APPLY" } else { "DRY RUN" });
    let mut rows = load_external_ids(ledger_path)?;

    let mut report = DeleteCommentsReport {
        applied: apply,
        total: rows.len(),
        pending: rows.iter().filter(|r| r.has_comment()).count(),
        ..Default::default()
    };

    let mut rejected = None;
    for row in rows.iter_mut().filter(|r| r.has_comment()) {
        let Some(comment_id) = row.comment_id else {
            continue;
        };
        if !apply {
            info!(
                "[DRY RUN] would delete comment {} from story {}",
                comment_id, row.id
            );
            continue;
        }

        info!("Deleting comment {} from story {}...", comment_id, row.id);
        match api.delete_story_comment(row.id, comment_id) {
            Ok(()) => {
                row.reset_comment();
                report.deleted += 1;
            }
            Err(e) if e.is_not_found() => {
                info!("comment {} on story {} was already deleted", comment_id, row.id);
                row.reset_comment();
                report.deleted += 1;
            }
            Err(e) if e.is_unauthorized() => {
                rejected = Some(e);
                break;
            }
            Err(e) => {
                error!("Error deleting comment from story {}: {}", row.id, e);
                row.error = format!("Error deleting comment: {}", e);
                report.failed += 1;
            }
        }
    }

    if let Some(e) = rejected {
        save_external_ids(ledger_path, &rows)?;
        return Err(e.into());
    }

    if apply {
        save_external_ids(ledger_path, &rows)?;
        info!("Comment deletion complete");
    } else {
        info!(
            "Dry run: {} comments would be deleted. Re-run with --apply to delete.",
            report.pending
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shortcut_api::MemoryApi;
    use std::fs;

    fn story(id: i64, external_id: Option<&str>) -> StorySummary {
        StorySummary {
            id,
            name: format!("S{}", id),
            story_type: "feature".into(),
            app_url: String::new(),
            external_id: external_id.map(str::to_string),
            labels: vec![],
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn old_ledgers_with_capitalised_booleans_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story_external_ids.csv");
        fs::write(
            &path,
            "id,external_id,comment_created_at,comment_id,success,error\n\
             1,100,2024-03-01T10:00:00Z,77,True,\n\
             2,200,,,False,boom\n\
             3,,,,,\n",
        )
        .unwrap();
        let rows = load_external_ids(&path).unwrap();
        assert_eq!(rows[0].success, Some(true));
        assert_eq!(rows[0].comment_id, Some(77));
        assert_eq!(rows[1].success, Some(false));
        assert_eq!(rows[2].success, None);
        assert!(!rows[0].needs_comment());
        assert!(rows[1].needs_comment());
        assert!(!rows[2].needs_comment());
    }

    #[test]
    fn seeds_ledger_and_comments_each_story_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/story_external_ids.csv");
        let api = MemoryApi::new();
        api.add_story(story(1, Some("100")));
        api.add_story(story(2, None));
        api.add_story(story(3, Some("300")));
        api.configure(|s| {
            s.fail_comment_stories.insert(3);
        });

        let report = run_add_comments(&api, &path, "g-1", true).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.posted, 1);
        assert_eq!(report.failed, 1);

        let rows = load_external_ids(&path).unwrap();
        assert_eq!(rows[0].success, Some(true));
        assert!(rows[0].comment_id.is_some());
        assert_eq!(rows[2].success, Some(false));
        assert!(rows[2].error.contains("comment rejected"));

        // A second run retries only the failure.
        api.configure(|s| s.fail_comment_stories.clear());
        let again = run_add_comments(&api, &path, "g-1", true).unwrap();
        assert_eq!(again.posted, 1);
        assert_eq!(again.successful, 2);

        let comments = api.snapshot().comments;
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].1.text, "Pivotal Tracker Id 100");
    }

    #[test]
    fn dry_run_posts_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story_external_ids.csv");
        let api = MemoryApi::new();
        api.add_story(story(1, Some("100")));

        let report = run_add_comments(&api, &path, "g-1", false).unwrap();
        assert_eq!(report.pending, 1);
        assert_eq!(report.posted, 0);
        assert!(api.snapshot().comments.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn delete_comments_resets_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story_external_ids.csv");
        let api = MemoryApi::new();
        api.add_story(story(1, Some("100")));
        api.add_story(story(2, Some("200")));
        run_add_comments(&api, &path, "g-1", true).unwrap();

        // The second comment vanished in the meantime.
        let second = api.snapshot().comments[1].1.id;
        api.delete_story_comment(2, second).unwrap();

        let report = run_delete_comments(&api, &path, true).unwrap();
        assert_eq!(report.pending, 2);
        assert_eq!(report.deleted, 2);
        assert!(api.snapshot().comments.is_empty());

        let rows = load_external_ids(&path).unwrap();
        assert!(rows.iter().all(|r| r.success.is_none() && r.comment_id.is_none()));
        assert!(rows.iter().all(|r| r.needs_comment()));
    }

    #[test]
    fn delete_comments_needs_a_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let api = MemoryApi::new();
        let err = run_delete_comments(&api, &dir.path().join("none.csv"), true).unwrap_err();
        assert!(matches!(err, ImportError::MissingLedger { .. }));
    }

    #[test]
    fn unauthorized_keeps_comments_already_posted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story_external_ids.csv");
        let api = MemoryApi::new();
        api.add_story(story(1, Some("100")));
        api.add_story(story(2, Some("200")));
        api.configure(|s| {
            s.unauthorized_ids.insert(2);
        });

        let err = run_add_comments(&api, &path, "g-1", true).unwrap_err();
        assert!(matches!(err, ImportError::Api(ref e) if e.is_unauthorized()));

        let rows = load_external_ids(&path).unwrap();
        assert_eq!(rows[0].success, Some(true));
        assert!(rows[0].comment_id.is_some());
        assert_eq!(rows[1].success, None);
        assert!(rows[1].needs_comment());
    }

    #[test]
    fn unauthorized_delete_keeps_comments_already_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story_external_ids.csv");
        let api = MemoryApi::new();
        api.add_story(story(1, Some("100")));
        api.add_story(story(2, Some("200")));
        run_add_comments(&api, &path, "g-1", true).unwrap();
        api.configure(|s| {
            s.unauthorized_ids.insert(2);
        });

        let err = run_delete_comments(&api, &path, true).unwrap_err();
        assert!(matches!(err, ImportError::Api(ref e) if e.is_unauthorized()));

        let rows = load_external_ids(&path).unwrap();
        assert!(rows[0].comment_id.is_none());
        assert!(rows[0].needs_comment());
        assert!(rows[1].comment_id.is_some());
        assert_eq!(api.snapshot().comments.len(), 1);
    }
}
