//! Comment attachments from the Pivotal dump database.
//!
//! The CSV export only carries comment text. The SQLite dump produced by the
//! Pivotal API exporter knows which files were attached to which comment;
//! the files themselves live under `data/<pivotal story id>/`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, params};
use shortcut_core::pivotal::{Attachment, PivotalRow};
use tracing::{debug, info, warn};

use crate::error::{ImportError, Result};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A comment as stored in the dump, with its attachments.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpComment {
    pub id: i64,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// Read-only handle on the Pivotal dump database.
#[derive(Debug)]
pub struct PivotalDump {
    conn: Connection,
    path: PathBuf,
}

impl PivotalDump {
    /// Opens the dump at `path`, or returns `None` when there is none.
    pub fn open(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            info!(
                "no Pivotal dump database at {}; comments are imported without attachments",
                path.display()
            );
            return Ok(None);
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| ImportError::database(path, e))?;
        debug!("opened Pivotal dump {}", path.display());
        Ok(Some(Self {
            conn,
            path: path.to_path_buf(),
        }))
    }

    /// Comments of a story in id order, attachments sorted by filename.
    pub fn comments_for(&self, story_id: &str) -> Result<Vec<DumpComment>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT C.id, C.text, FA.filename, FA.content_type
                 FROM comment AS C
                 LEFT JOIN file_attachment AS FA ON C.id = FA.comment_id
                 WHERE C.story_id = ?1
                 ORDER BY C.id, FA.filename",
            )
            .map_err(|e| ImportError::database(&self.path, e))?;

        let rows = stmt
            .query_map(params![story_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .map_err(|e| ImportError::database(&self.path, e))?;

        let mut comments: BTreeMap<i64, DumpComment> = BTreeMap::new();
        for row in rows {
            let (id, text, filename, content_type) =
                row.map_err(|e| ImportError::database(&self.path, e))?;
            let comment = comments.entry(id).or_insert_with(|| DumpComment {
                id,
                text: text.unwrap_or_default(),
                attachments: Vec::new(),
            });
            if let Some(filename) = filename.filter(|f| !f.is_empty()) {
                comment.attachments.push(Attachment {
                    filename,
                    content_type: content_type
                        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                });
            }
        }
        Ok(comments.into_values().collect())
    }

    /// Replaces the row's comment text with the dump's and attaches files.
    ///
    /// Comments are matched by position. A query failure is logged and the
    /// row is left as it came from the CSV.
    pub fn enrich(&self, row: &mut PivotalRow) {
        if row.comments.is_empty() {
            return;
        }
        let dumped = match self.comments_for(&row.external_id) {
            Ok(c) => c,
            Err(e) => {
                warn!("story {}: could not read comments: {}", row.external_id, e);
                return;
            }
        };
        for (comment, dumped) in row.comments.iter_mut().zip(dumped) {
            comment.text = dumped.text;
            comment.attachments = dumped.attachments;
        }
    }
}

/// Indexes every file under `dir` (recursively) by file name.
///
/// When two files share a name the first one found wins.
pub fn index_story_files(dir: &Path) -> Result<HashMap<String, PathBuf>> {
    let mut files = HashMap::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|e| ImportError::io(&current, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ImportError::io(&current, e))?;
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.entry(name.to_string()).or_insert(path);
            }
        }
    }
    Ok(files)
}

/// Markdown link for an uploaded file: images inline, everything else as a
/// plain link.
pub fn attachment_markdown(attachment: &Attachment, filename: &str, url: &str) -> String {
    format!(
        "{}[{}]({})",
        if attachment.is_image() { "!" } else { "" },
        filename,
        url
    )
}

/// Appends attachment links to a comment body.
pub fn append_attachment_links(text: &mut String, links: &[String]) {
    if links.is_empty() {
        return;
    }
    text.push_str("\n\n");
    text.push_str(&links.join("\n"));
    text.push('\n');
}
