//! Local CSV ledgers.
//!
//! - `shortcut_imported_entities.csv` (`type,id`): every entity an applied
//!   import created, in creation order. The delete workflow reads it back.
//! - `failed_stories.csv` / `failed_files.csv`: append-only failure logs.
//!
//! Rewrites go through a temporary file in the same directory that is
//! renamed over the original, so a crash never leaves a half-written ledger.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shortcut_core::entity::{CreatedEntity, EntityType};
use tracing::{debug, info, warn};

use crate::error::{ImportError, Result};

/// Header of the imported-entities ledger.
pub const LEDGER_HEADER: [&str; 2] = ["type", "id"];

/// One `(type, id)` row of the imported-entities ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub id: i64,
}

impl LedgerEntry {
    pub fn new(entity_type: EntityType, id: i64) -> Self {
        Self { entity_type, id }
    }
}

impl From<&CreatedEntity> for LedgerEntry {
    fn from(e: &CreatedEntity) -> Self {
        Self::new(e.entity_type, e.id)
    }
}

// ---------------------------------------------------------------------------
// Imported entities
// ---------------------------------------------------------------------------

/// Append-only writer for the imported-entities ledger of one run.
#[derive(Debug)]
pub struct ImportedEntitiesLedger {
    path: PathBuf,
    written: HashSet<LedgerEntry>,
}

impl ImportedEntitiesLedger {
    /// Starts a fresh ledger at `path`, truncating any previous one.
    pub fn create(path: &Path) -> Result<Self> {
        ensure_parent(path)?;
        let mut writer = csv::Writer::from_path(path).map_err(|e| ImportError::csv(path, e))?;
        writer
            .write_record(LEDGER_HEADER)
            .and_then(|_| writer.flush().map_err(csv::Error::from))
            .map_err(|e| ImportError::csv(path, e))?;
        debug!("started ledger {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            written: HashSet::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends entries not written before in this run; returns how many.
    pub fn append<I>(&mut self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = LedgerEntry>,
    {
        let fresh: Vec<LedgerEntry> = entries
            .into_iter()
            .filter(|e| self.written.insert(*e))
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| ImportError::io(&self.path, e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for entry in &fresh {
            writer
                .serialize(entry)
                .map_err(|e| ImportError::csv(&self.path, e))?;
            info!(
                "Wrote {} {} to {}",
                entry.entity_type,
                entry.id,
                self.path.display()
            );
        }
        writer
            .flush()
            .map_err(|e| ImportError::io(&self.path, e))?;
        Ok(fresh.len())
    }
}

/// A ledger row before its type is checked.
#[derive(Debug, Deserialize)]
struct RawLedgerRow {
    #[serde(rename = "type")]
    entity_type: String,
    id: i64,
}

/// Reads every row of an imported-entities ledger.
///
/// Rows whose type is not a known entity type are logged and skipped.
///
/// # Errors
///
/// Returns [`ImportError::MissingLedger`] when the file does not exist.
pub fn read_ledger(path: &Path) -> Result<Vec<LedgerEntry>> {
    if !path.exists() {
        return Err(ImportError::MissingLedger {
            path: path.to_path_buf(),
        });
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| ImportError::csv(path, e))?;
    let mut entries = Vec::new();
    for row in reader.deserialize::<RawLedgerRow>() {
        let row = row.map_err(|e| ImportError::csv(path, e))?;
        match row.entity_type.parse::<EntityType>() {
            Ok(entity_type) => entries.push(LedgerEntry::new(entity_type, row.id)),
            Err(_) => warn!(
                "Unknown entity type '{}' for id {} in {}; skipping",
                row.entity_type,
                row.id,
                path.display()
            ),
        }
    }
    Ok(entries)
}

/// Atomically replaces the ledger with `entries`.
pub fn rewrite_ledger(path: &Path, entries: &[LedgerEntry]) -> Result<()> {
    write_csv_atomic(path, &LEDGER_HEADER, entries)
}

// ---------------------------------------------------------------------------
// Failure logs
// ---------------------------------------------------------------------------

/// A row of `failed_stories.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedStory {
    pub story_name: String,
    pub external_id: String,
    pub error_message: String,
    /// JSON of what would have been sent.
    pub story_payload: String,
    pub timestamp: String,
}

/// A row of `failed_files.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedFile {
    /// Pivotal id of the story the file belongs to.
    pub story_id: String,
    pub filename: String,
    pub error: String,
    pub timestamp: String,
}

/// Local wall-clock timestamp used in the failure logs.
pub fn failure_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Appends rows to a CSV file, writing the header only when the file is new.
pub fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    ensure_parent(path)?;
    let is_new = !path.exists();
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| ImportError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    for row in rows {
        writer.serialize(row).map_err(|e| ImportError::csv(path, e))?;
    }
    writer.flush().map_err(|e| ImportError::io(path, e))?;
    info!("Added {} rows to {}", rows.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Writes `header` and `rows` to a temporary file next to `path`, then
/// renames it over `path`.
pub fn write_csv_atomic<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| ImportError::io(&dir, e))?;
    let tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| ImportError::io(&dir, e))?;

    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file());
        writer
            .write_record(header)
            .map_err(|e| ImportError::csv(path, e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| ImportError::csv(path, e))?;
        }
        writer.flush().map_err(|e| ImportError::io(path, e))?;
    }

    tmp.persist(path)
        .map_err(|e| ImportError::io(path, e.error))?;
    debug!("rewrote {} ({} rows)", path.display(), rows.len());
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| ImportError::io(dir, e))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ledger_is_truncated_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/shortcut_imported_entities.csv");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "type,id\nstory,1\n").unwrap();

        let mut ledger = ImportedEntitiesLedger::create(&path).unwrap();
        let label = LedgerEntry::new(EntityType::Label, 10);
        let story = LedgerEntry::new(EntityType::Story, 11);
        assert_eq!(ledger.append([label, story]).unwrap(), 2);
        assert_eq!(ledger.append([story]).unwrap(), 0);

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "type,id\nlabel,10\nstory,11\n"
        );
        assert_eq!(read_ledger(&path).unwrap(), vec![label, story]);
    }

    #[test]
    fn missing_ledger_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_ledger(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, ImportError::MissingLedger { .. }));
    }

    #[test]
    fn unknown_types_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        fs::write(&path, "type,id\nstory,1\nwidget,7\nepic,2\n").unwrap();
        assert_eq!(
            read_ledger(&path).unwrap(),
            vec![
                LedgerEntry::new(EntityType::Story, 1),
                LedgerEntry::new(EntityType::Epic, 2),
            ]
        );
    }

    #[test]
    fn rewrite_keeps_header_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        fs::write(&path, "type,id\nepic,3\n").unwrap();
        rewrite_ledger(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "type,id\n");
    }

    #[test]
    fn failure_log_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed_files.csv");
        let row = FailedFile {
            story_id: "42".into(),
            filename: "a.png".into(),
            error: "boom".into(),
            timestamp: "2024-03-01 10:00:00".into(),
        };
        append_rows(&path, std::slice::from_ref(&row)).unwrap();
        append_rows(&path, &[row]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "story_id,filename,error,timestamp\n\
             42,a.png,boom,2024-03-01 10:00:00\n\
             42,a.png,boom,2024-03-01 10:00:00\n"
        );
    }
}
