//! Creating the collected entities in Shortcut.
//!
//! Order matters: the run label first (its page is where progress can be
//! watched), then epics and iterations, then stories in batches so each
//! batch can be linked to the epics and iterations created before it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use shortcut_api::ShortcutApi;
use shortcut_config::CookbookConfig;
use shortcut_core::entity::CreatedEntity;
use shortcut_core::mapping::{EpicLinks, IterationLinks, MappedStory, iteration_payload};
use shortcut_core::payload::CreateStory;
use shortcut_core::pivotal::PivotalIteration;
use tracing::{error, info, warn};

use crate::attachments::{append_attachment_links, attachment_markdown, index_story_files};
use crate::collector::{EntityCollector, EntityCounts, InvalidRow};
use crate::error::Result;
use crate::ledger::{
    FailedFile, FailedStory, ImportedEntitiesLedger, LedgerEntry, append_rows, failure_timestamp,
};

/// Where and how a commit writes.
#[derive(Debug, Clone)]
pub struct CommitOptions {
    /// Mutating calls are real and ledgers are written.
    pub apply: bool,
    pub batch_size: usize,
    /// Root of the per-story attachment directories.
    pub data_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub failed_stories_path: PathBuf,
    pub failed_files_path: PathBuf,
}

impl CommitOptions {
    pub fn from_config(config: &CookbookConfig, apply: bool) -> Self {
        Self {
            apply,
            batch_size: config.batch_size.max(1),
            data_dir: config.data_dir.clone(),
            ledger_path: config.imported_entities_csv(),
            failed_stories_path: config.failed_stories_csv(),
            failed_files_path: config.failed_files_csv(),
        }
    }
}

/// Outcome of an import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub applied: bool,
    pub run_label: String,
    pub run_label_url: Option<String>,
    pub planned: EntityCounts,
    pub created: EntityCounts,
    pub invalid_rows: usize,
    pub failed_stories: usize,
    pub failed_files: usize,
}

/// Creates everything in `collector` through `api`.
///
/// In dry-run mode `api` is expected to be a
/// [`DryRunApi`](shortcut_api::DryRunApi); nothing is written to disk.
pub fn commit(
    api: &dyn ShortcutApi,
    collector: EntityCollector,
    options: &CommitOptions,
) -> Result<ImportReport> {
    let mut committer = Committer::new(api, options, &collector)?;
    committer.record_invalid(&collector.invalid)?;
    committer.create_run_label(&collector)?;
    let epic_links = committer.create_epics(&collector)?;
    let iteration_links = committer.create_iterations(&collector)?;
    committer.create_stories(collector.stories, &epic_links, &iteration_links)?;
    Ok(committer.report)
}

/// `Err` carries the failure message and the files that did not upload.
type UploadOutcome = std::result::Result<(), (String, Vec<FailedFile>)>;

struct Committer<'a> {
    api: &'a dyn ShortcutApi,
    options: &'a CommitOptions,
    ledger: Option<ImportedEntitiesLedger>,
    report: ImportReport,
}

impl<'a> Committer<'a> {
    fn new(
        api: &'a dyn ShortcutApi,
        options: &'a CommitOptions,
        collector: &EntityCollector,
    ) -> Result<Self> {
        let ledger = if options.apply {
            Some(ImportedEntitiesLedger::create(&options.ledger_path)?)
        } else {
            None
        };
        Ok(Self {
            api,
            options,
            ledger,
            report: ImportReport {
                applied: options.apply,
                run_label: collector.run_label.name.clone(),
                planned: collector.planned(),
                invalid_rows: collector.invalid.len(),
                ..Default::default()
            },
        })
    }

    // -- Bookkeeping ---------------------------------------------------------

    fn created(&mut self, entities: &[CreatedEntity]) -> Result<()> {
        for entity in entities {
            self.report.created.add(entity.entity_type, 1);
        }
        if let Some(ledger) = self.ledger.as_mut() {
            ledger.append(entities.iter().map(LedgerEntry::from))?;
        }
        Ok(())
    }

    fn failed_stories(&mut self, rows: Vec<FailedStory>) -> Result<()> {
        self.report.failed_stories += rows.len();
        if self.options.apply {
            append_rows(&self.options.failed_stories_path, &rows)?;
        }
        Ok(())
    }

    fn failed_files(&mut self, rows: Vec<FailedFile>) -> Result<()> {
        self.report.failed_files += rows.len();
        if self.options.apply {
            append_rows(&self.options.failed_files_path, &rows)?;
        }
        Ok(())
    }

    fn record_invalid(&mut self, invalid: &[InvalidRow]) -> Result<()> {
        if invalid.is_empty() || !self.options.apply {
            return Ok(());
        }
        let timestamp = failure_timestamp();
        let rows: Vec<FailedStory> = invalid
            .iter()
            .map(|row| FailedStory {
                story_name: row.name.clone(),
                external_id: row.external_id.clone(),
                error_message: format!("line {}: {}", row.line, row.error),
                story_payload: row.payload.clone(),
                timestamp: timestamp.clone(),
            })
            .collect();
        // Invalid rows are not counted as failed creations.
        append_rows(&self.options.failed_stories_path, &rows)
    }

    // -- Phases --------------------------------------------------------------

    fn create_run_label(&mut self, collector: &EntityCollector) -> Result<()> {
        info!("Processing labels...");
        let label = self.api.create_label(&collector.run_label)?;
        info!(
            "Import Started\n\n==> Click here to monitor import progress: {}",
            label.app_url
        );
        self.report.run_label_url = Some(label.app_url.clone());
        self.created(std::slice::from_ref(&label))
    }

    fn create_epics(&mut self, collector: &EntityCollector) -> Result<EpicLinks> {
        info!("Processing epics...");
        let mut created = Vec::new();
        let mut failures = Vec::new();
        for epic in &collector.epics {
            match self.api.create_epic(&epic.payload) {
                Ok(entity) => created.push((epic, entity)),
                Err(e) if e.is_unauthorized() => return Err(e.into()),
                Err(e) => {
                    error!("Failed to create epic {}: {}", epic.payload.name, e);
                    failures.push(FailedStory {
                        story_name: epic.payload.name.clone(),
                        external_id: epic.payload.external_id.clone().unwrap_or_default(),
                        error_message: e.to_string(),
                        story_payload: serde_json::to_string(&epic.payload).unwrap_or_default(),
                        timestamp: failure_timestamp(),
                    });
                }
            }
        }
        let entities: Vec<CreatedEntity> = created.iter().map(|(_, e)| e.clone()).collect();
        self.created(&entities)?;
        self.failed_stories(failures)?;
        info!("Finished creating {} epics", entities.len());

        Ok(EpicLinks::new(
            created.iter().map(|(epic, entity)| (&epic.payload, entity.id)),
            &collector.run_label.name,
        ))
    }

    fn create_iterations(&mut self, collector: &EntityCollector) -> Result<IterationLinks> {
        info!("Processing iterations...");
        let mut created: Vec<(&PivotalIteration, CreatedEntity)> = Vec::new();
        for iteration in &collector.iterations {
            match self.api.create_iteration(&iteration_payload(iteration)) {
                Ok(entity) => created.push((iteration, entity)),
                Err(e) if e.is_unauthorized() => return Err(e.into()),
                Err(e) => error!("Failed to create iteration PT {}: {}", iteration.id, e),
            }
        }
        let entities: Vec<CreatedEntity> = created.iter().map(|(_, e)| e.clone()).collect();
        self.created(&entities)?;
        info!("Finished creating {} iterations", entities.len());

        Ok(IterationLinks::new(
            created.iter().map(|(iteration, entity)| (*iteration, entity.id)),
        ))
    }

    fn create_stories(
        &mut self,
        stories: Vec<MappedStory>,
        epics: &EpicLinks,
        iterations: &IterationLinks,
    ) -> Result<()> {
        let batch_size = self.options.batch_size.max(1);
        let batches = stories.len().div_ceil(batch_size);
        let mut total = 0;

        for (n, chunk) in stories.chunks(batch_size).enumerate() {
            info!("Processing batch {} of {}", n + 1, batches);
            let mut batch = chunk.to_vec();
            for story in &mut batch {
                epics.link(&mut story.payload);
                iterations.link(story);
            }

            let ready = self.attach_files(batch)?;
            let created = self.create_batch(&ready)?;
            total += created.len();
            self.created(&created)?;
        }

        info!("Finished creating {} stories", total);
        Ok(())
    }

    /// Uploads attachments and links them into comment text.
    ///
    /// Stories with a failed upload are dropped from the batch and logged.
    fn attach_files(&mut self, batch: Vec<MappedStory>) -> Result<Vec<CreateStory>> {
        let mut ready = Vec::with_capacity(batch.len());
        let mut failed_stories = Vec::new();
        let mut failed_files = Vec::new();

        for mut story in batch {
            let pt_id = story.payload.external_id.clone().unwrap_or_default();
            let dir = self.options.data_dir.join(&pt_id);
            if story.attachments.is_empty() || !dir.is_dir() {
                ready.push(story.payload);
                continue;
            }

            match self.upload_story_files(&mut story, &pt_id, &dir)? {
                Ok(()) => ready.push(story.payload),
                Err((message, files)) => {
                    error!("story {}: {}", pt_id, message);
                    failed_files.extend(files);
                    failed_stories.push(FailedStory {
                        story_name: story.payload.name.clone(),
                        external_id: pt_id,
                        error_message: message,
                        story_payload: serde_json::to_string(&story.payload).unwrap_or_default(),
                        timestamp: failure_timestamp(),
                    });
                }
            }
        }

        self.failed_files(failed_files)?;
        self.failed_stories(failed_stories)?;
        Ok(ready)
    }

    /// The outer error aborts the run; [`UploadOutcome`] is per story.
    fn upload_story_files(
        &mut self,
        story: &mut MappedStory,
        pt_id: &str,
        dir: &Path,
    ) -> Result<UploadOutcome> {
        let files: HashMap<String, PathBuf> = index_story_files(dir)?;
        let prefix = if self.options.apply { "" } else { "[DRY RUN] " };
        info!("{}Processing files for story {}...", prefix, pt_id);

        for (index, attachments) in &story.attachments {
            let found: Vec<_> = attachments
                .iter()
                .filter_map(|a| files.get(&a.filename).map(|p| (a, p)))
                .collect();
            if found.is_empty() {
                continue;
            }
            info!(
                "{}Uploading {} files for comment {} in story {}",
                prefix,
                found.len(),
                index,
                pt_id
            );

            let mut links = Vec::with_capacity(found.len());
            let mut failed = Vec::new();
            for (attachment, path) in found {
                match self.api.upload_file(path) {
                    Ok(uploaded) => {
                        links.push(attachment_markdown(attachment, &uploaded.filename, &uploaded.url));
                        self.created(&[uploaded.as_created()])?;
                    }
                    Err(e) if e.is_unauthorized() => return Err(e.into()),
                    Err(e) => failed.push(FailedFile {
                        story_id: pt_id.to_string(),
                        filename: attachment.filename.clone(),
                        error: e.to_string(),
                        timestamp: failure_timestamp(),
                    }),
                }
            }

            if !failed.is_empty() {
                let names: Vec<&str> = failed.iter().map(|f| f.filename.as_str()).collect();
                let message = format!("Failed to upload files: {}", names.join(", "));
                return Ok(Err((message, failed)));
            }

            if let Some(comment) = story.payload.comments.get_mut(*index) {
                append_attachment_links(&mut comment.text, &links);
            }
        }
        Ok(Ok(()))
    }

    /// Bulk-creates a batch, falling back to one request per story.
    fn create_batch(&mut self, stories: &[CreateStory]) -> Result<Vec<CreatedEntity>> {
        if stories.is_empty() {
            return Ok(Vec::new());
        }
        let prefix = if self.options.apply { "" } else { "[DRY RUN] " };

        match self.api.create_stories(stories) {
            Ok(created) => {
                info!("{}Successfully created batch of {} stories", prefix, created.len());
                return Ok(created);
            }
            Err(e) if e.is_unauthorized() => return Err(e.into()),
            Err(e) => {
                warn!("Bulk creation failed ({}). Attempting individual story creation...", e);
            }
        }

        let mut created = Vec::with_capacity(stories.len());
        let mut failures = Vec::new();
        for story in stories {
            match self.api.create_story(story) {
                Ok(entity) => created.push(entity),
                Err(e) if e.is_unauthorized() => return Err(e.into()),
                Err(e) => {
                    error!("Failed to create story {}: {}", story.name, e);
                    failures.push(FailedStory {
                        story_name: story.name.clone(),
                        external_id: story.external_id.clone().unwrap_or_default(),
                        error_message: e.to_string(),
                        story_payload: serde_json::to_string(story).unwrap_or_default(),
                        timestamp: failure_timestamp(),
                    });
                }
            }
        }
        self.failed_stories(failures)?;
        Ok(created)
    }
}
