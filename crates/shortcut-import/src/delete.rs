//! Rolling back an import from its ledger.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use shortcut_api::ShortcutApi;
use tracing::{error, info};

use crate::collector::EntityCounts;
use crate::error::Result;
use crate::ledger::{LedgerEntry, read_ledger, rewrite_ledger};

/// An entity that could not be deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteFailure {
    #[serde(flatten)]
    pub entry: LedgerEntry,
    pub error: String,
}

/// Outcome of a delete run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteReport {
    pub applied: bool,
    /// Unique ledger entries, per type.
    pub planned: EntityCounts,
    pub deleted: usize,
    /// Entities the API no longer knew (404), counted as deleted.
    pub already_gone: usize,
    pub failed: Vec<DeleteFailure>,
}

/// Ledger entries, de-duplicated and sorted so dependents go first.
pub fn deletion_order(entries: &[LedgerEntry]) -> Vec<LedgerEntry> {
    let unique: BTreeSet<LedgerEntry> = entries.iter().copied().collect();
    let mut ordered: Vec<LedgerEntry> = unique.into_iter().collect();
    ordered.sort_by_key(|e| (e.entity_type.delete_rank(), e.id));
    ordered
}

/// Deletes every entity recorded in the ledger at `ledger_path`.
///
/// Without `apply` only the counts are reported. Entities that are already
/// gone count as deleted. Afterwards the ledger keeps only the entries that
/// failed, so a re-run retries exactly those.
pub fn run_delete(
    api: &dyn ShortcutApi,
    ledger_path: &Path,
    delay: Duration,
    apply: bool,
) -> Result<DeleteReport> {
    info!("Running in {} mode", if apply { "APPLY" } else { "DRY RUN" });
    let entries = read_ledger(ledger_path)?;
    let ordered = deletion_order(&entries);

    let mut report = DeleteReport {
        applied: apply,
        ..Default::default()
    };
    for entry in &ordered {
        report.planned.add(entry.entity_type, 1);
    }
    info!(
        "Found {} entities to delete in {}",
        ordered.len(),
        ledger_path.display()
    );
    report.planned.log();

    if !apply {
        info!("Dry run: nothing deleted. Re-run with --apply to delete.");
        return Ok(report);
    }

    let mut removed: HashSet<LedgerEntry> = HashSet::new();
    let mut rejected = None;
    for entry in &ordered {
        match api.delete_entity(entry.entity_type, entry.id) {
            Ok(()) => {
                info!("Deleted {} {}", entry.entity_type, entry.id);
                report.deleted += 1;
                removed.insert(*entry);
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
            Err(e) if e.is_not_found() => {
                info!("{} {} was already deleted", entry.entity_type, entry.id);
                report.already_gone += 1;
                removed.insert(*entry);
            }
            Err(e) if e.is_unauthorized() => {
                rejected = Some(e);
                break;
            }
            Err(e) => {
                error!("Failed to delete {} {}: {}", entry.entity_type, entry.id, e);
                report.failed.push(DeleteFailure {
                    entry: *entry,
                    error: e.to_string(),
                });
            }
        }
    }

    let remaining: Vec<LedgerEntry> = entries
        .into_iter()
        .filter(|e| !removed.contains(e))
        .collect();
    rewrite_ledger(ledger_path, &remaining)?;
    if let Some(e) = rejected {
        return Err(e.into());
    }
    info!(
        "Deleted {} entities ({} already gone, {} failed)",
        report.deleted,
        report.already_gone,
        report.failed.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shortcut_api::MemoryApi;
    use shortcut_core::entity::EntityType;
    use std::fs;

    use crate::error::ImportError;

    fn ledger(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("shortcut_imported_entities.csv");
        fs::write(
            &path,
            "type,id\nlabel,1\nepic,2\nstory,4\nfile,5\nstory,3\nstory,4\niteration,6\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn order_is_dependents_first_without_duplicates() {
        let entries = vec![
            LedgerEntry::new(EntityType::Label, 1),
            LedgerEntry::new(EntityType::Story, 4),
            LedgerEntry::new(EntityType::File, 5),
            LedgerEntry::new(EntityType::Story, 4),
            LedgerEntry::new(EntityType::Epic, 2),
        ];
        let types: Vec<_> = deletion_order(&entries)
            .iter()
            .map(|e| (e.entity_type, e.id))
            .collect();
        assert_eq!(
            types,
            vec![
                (EntityType::File, 5),
                (EntityType::Story, 4),
                (EntityType::Epic, 2),
                (EntityType::Label, 1),
            ]
        );
    }

    #[test]
    fn dry_run_only_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = ledger(dir.path());
        let before = fs::read_to_string(&path).unwrap();
        let api = MemoryApi::new();

        let report = run_delete(&api, &path, Duration::ZERO, false).unwrap();
        assert_eq!(report.planned.total(), 6);
        assert_eq!(report.planned.get(EntityType::Story), 2);
        assert!(api.snapshot().deleted.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn apply_deletes_only_ledger_entries_and_rewrites_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = ledger(dir.path());
        let api = MemoryApi::new();
        api.configure(|s| {
            s.missing.insert((EntityType::Epic, 2));
        });

        let report = run_delete(&api, &path, Duration::ZERO, true).unwrap();
        assert_eq!(report.deleted, 5);
        assert_eq!(report.already_gone, 1);
        assert!(report.failed.is_empty());

        let deleted = api.snapshot().deleted;
        assert_eq!(deleted[0], (EntityType::File, 5));
        assert_eq!(deleted.last(), Some(&(EntityType::Label, 1)));
        assert!(!deleted.contains(&(EntityType::Epic, 2)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "type,id\n");
    }

    #[test]
    fn missing_ledger_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let api = MemoryApi::new();
        assert!(run_delete(&api, &dir.path().join("none.csv"), Duration::ZERO, true).is_err());
    }

    #[test]
    fn unauthorized_stops_but_drops_what_was_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = ledger(dir.path());
        let api = MemoryApi::new();
        api.configure(|s| {
            s.unauthorized_ids.insert(4);
        });

        let err = run_delete(&api, &path, Duration::ZERO, true).unwrap_err();
        assert!(matches!(err, ImportError::Api(ref e) if e.is_unauthorized()));

        // file 5 and story 3 went before story 4 was refused.
        assert_eq!(
            api.snapshot().deleted,
            vec![(EntityType::File, 5), (EntityType::Story, 3)]
        );
        let remaining = read_ledger(&path).unwrap();
        assert!(!remaining.contains(&LedgerEntry::new(EntityType::Story, 3)));
        assert!(!remaining.contains(&LedgerEntry::new(EntityType::File, 5)));
        assert!(remaining.contains(&LedgerEntry::new(EntityType::Story, 4)));
        assert!(remaining.contains(&LedgerEntry::new(EntityType::Label, 1)));
    }
}
