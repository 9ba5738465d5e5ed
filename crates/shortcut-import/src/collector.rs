//! Reading the Pivotal export into the entities an import will create.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::Serialize;
use shortcut_core::entity::EntityType;
use shortcut_core::mapping::{MappedEntity, MappedEpic, MappedStory, MappingContext, build_entity};
use shortcut_core::payload::CreateLabel;
use shortcut_core::pivotal::{PivotalIteration, normalize_header, parse_row};
use tracing::{debug, info, warn};

use crate::attachments::PivotalDump;
use crate::error::{ImportError, Result};

/// Counts of entities per type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts(pub BTreeMap<EntityType, usize>);

impl EntityCounts {
    pub fn add(&mut self, entity_type: EntityType, n: usize) {
        if n > 0 {
            *self.0.entry(entity_type).or_default() += n;
        }
    }

    pub fn get(&self, entity_type: EntityType) -> usize {
        self.0.get(&entity_type).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Logs one line per entity type.
    pub fn log(&self) {
        for (entity_type, count) in &self.0 {
            info!("  {}: {}", entity_type, count);
        }
    }
}

impl fmt::Display for EntityCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(t, n)| format!("{}: {}", t, n))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// A source row that could not be turned into an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRow {
    /// 1-based line in the export (header is line 1).
    pub line: u64,
    pub external_id: String,
    pub name: String,
    pub error: String,
    /// JSON of the parsed row, when parsing got that far.
    pub payload: String,
}

/// Everything an import run will create, grouped by kind.
#[derive(Debug, Clone)]
pub struct EntityCollector {
    pub run_label: CreateLabel,
    pub epics: Vec<MappedEpic>,
    pub stories: Vec<MappedStory>,
    pub iterations: BTreeSet<PivotalIteration>,
    pub invalid: Vec<InvalidRow>,
}

impl EntityCollector {
    pub fn new(run_label: &str) -> Self {
        Self {
            run_label: CreateLabel {
                name: run_label.to_string(),
                color: None,
            },
            epics: Vec::new(),
            stories: Vec::new(),
            iterations: BTreeSet::new(),
            invalid: Vec::new(),
        }
    }

    pub fn collect(&mut self, entity: MappedEntity) {
        match entity {
            MappedEntity::Story(story) => {
                if let Some(iteration) = &story.iteration {
                    self.iterations.insert(iteration.clone());
                }
                self.stories.push(*story);
            }
            MappedEntity::Epic(epic) => self.epics.push(epic),
        }
    }

    /// What the run will try to create.
    pub fn planned(&self) -> EntityCounts {
        let mut counts = EntityCounts::default();
        counts.add(EntityType::Label, 1);
        counts.add(EntityType::Epic, self.epics.len());
        counts.add(EntityType::Iteration, self.iterations.len());
        counts.add(EntityType::Story, self.stories.len());
        counts
    }
}

/// Reads the Pivotal CSV export into `collector`.
///
/// Rows that fail to parse or map are kept in `collector.invalid` and never
/// created. When `dump` is given, comment attachments are looked up in it.
pub fn read_pivotal_csv(
    path: &Path,
    dump: Option<&PivotalDump>,
    ctx: &MappingContext,
    collector: &mut EntityCollector,
) -> Result<()> {
    info!("Reading Pivotal export {}", path.display());
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ImportError::csv(path, e))?;

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => normalize_header(record.map_err(|e| ImportError::csv(path, e))?.iter()),
        None => {
            warn!("{} is empty", path.display());
            return Ok(());
        }
    };

    let mut line = 1u64;
    for record in records {
        line += 1;
        let record = record.map_err(|e| ImportError::csv(path, e))?;

        let mut row = match parse_row(&header, record.iter()) {
            Ok(row) => row,
            Err(e) => {
                warn!("line {}: skipping row: {}", line, e);
                collector.invalid.push(InvalidRow {
                    line,
                    external_id: String::new(),
                    name: String::new(),
                    error: e.to_string(),
                    payload: String::new(),
                });
                continue;
            }
        };

        if let Some(dump) = dump {
            dump.enrich(&mut row);
        }

        match build_entity(ctx, &row) {
            Ok(entity) => {
                debug!("collected {} '{}'", entity.entity_type(), entity.name());
                collector.collect(entity);
            }
            Err(e) => {
                warn!("line {}: skipping row: {}", line, e);
                collector.invalid.push(InvalidRow {
                    line,
                    external_id: row.external_id.clone(),
                    name: row.name.clone(),
                    error: e.to_string(),
                    payload: serde_json::to_string(&row).unwrap_or_default(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn ctx() -> MappingContext {
        MappingContext {
            group_id: Some("g-1".into()),
            workflow_states: HashMap::from([
                ("accepted".to_string(), Some(500)),
                ("unstarted".to_string(), Some(400)),
            ]),
            run_label: "pivotal->shortcut 2024-03-01 10:00".into(),
            ..Default::default()
        }
    }

    #[test]
    fn rows_are_collected_and_invalid_rows_kept_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pt.csv");
        std::fs::write(
            &path,
            "Id,Title,Type,Current State,Iteration,Iteration Start,Iteration End,Labels\n\
             1,First,feature,accepted,7,\"Mar 1, 2022\",\"Mar 8, 2022\",\n\
             2,Second,bug,accepted,7,\"Mar 1, 2022\",\"Mar 8, 2022\",\n\
             3,Broken,chore,teleported,,,,\n\
             4,An epic,epic,,,,,backend\n\
             ,No id,feature,accepted,,,,\n",
        )
        .unwrap();

        let mut collector = EntityCollector::new("pivotal->shortcut 2024-03-01 10:00");
        read_pivotal_csv(&path, None, &ctx(), &mut collector).unwrap();

        assert_eq!(collector.stories.len(), 2);
        assert_eq!(collector.epics.len(), 1);
        assert_eq!(collector.iterations.len(), 1);
        assert_eq!(collector.invalid.len(), 2);
        assert_eq!(collector.invalid[0].external_id, "3");
        assert_eq!(collector.invalid[0].line, 4);
        assert_eq!(collector.invalid[1].line, 6);

        let planned = collector.planned();
        assert_eq!(planned.get(EntityType::Story), 2);
        assert_eq!(planned.get(EntityType::Label), 1);
        assert_eq!(planned.total(), 5);
        assert_eq!(planned.to_string(), "story: 2, epic: 1, iteration: 1, label: 1");
    }

    #[test]
    fn empty_export_collects_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pt.csv");
        std::fs::write(&path, "").unwrap();
        let mut collector = EntityCollector::new("run");
        read_pivotal_csv(&path, None, &ctx(), &mut collector).unwrap();
        assert!(collector.stories.is_empty());
    }
}
