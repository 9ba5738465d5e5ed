//! [`DryRunApi`] -- answers writes locally and passes reads through.

use std::cell::Cell;
use std::path::Path;

use chrono::Utc;
use shortcut_core::entity::{
    CreatedEntity, EntityType, Member, StoryComment, StorySummary, UploadedFile,
};
use shortcut_core::payload::{
    BulkLabelUpdate, CreateEpic, CreateIteration, CreateLabel, CreateStory,
};
use tracing::info;

use crate::error::Result;
use crate::traits::ShortcutApi;

/// Wraps another [`ShortcutApi`] so that nothing is mutated.
///
/// Reads go to the inner API. Every write is logged with a `[DRY RUN]`
/// prefix and returns a synthetic entity: ids count up from 0, app URLs
/// point at `https://example.com/entity/{id}`, uploaded files at
/// `https://mock-url/{filename}`.
#[derive(Debug)]
pub struct DryRunApi<A> {
    inner: A,
    next_id: Cell<i64>,
}

impl<A: ShortcutApi> DryRunApi<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            next_id: Cell::new(0),
        }
    }

    pub fn into_inner(self) -> A {
        self.inner
    }

    fn next_id(&self) -> i64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn synthetic(
        &self,
        entity_type: EntityType,
        name: &str,
        external_id: Option<&str>,
    ) -> CreatedEntity {
        let id = self.next_id();
        info!("[DRY RUN] would create {} '{}'", entity_type, name);
        CreatedEntity {
            id,
            entity_type,
            app_url: format!("https://example.com/entity/{}", id),
            name: Some(name.to_string()),
            external_id: external_id.map(str::to_string),
        }
    }
}

impl<A: ShortcutApi> ShortcutApi for DryRunApi<A> {
    fn list_members(&self) -> Result<Vec<Member>> {
        self.inner.list_members()
    }

    fn group_stories(&self, group_id: &str) -> Result<Vec<StorySummary>> {
        self.inner.group_stories(group_id)
    }

    fn search_stories(&self, query: &str) -> Result<Vec<StorySummary>> {
        self.inner.search_stories(query)
    }

    fn create_label(&self, label: &CreateLabel) -> Result<CreatedEntity> {
        Ok(self.synthetic(EntityType::Label, &label.name, None))
    }

    fn create_epic(&self, epic: &CreateEpic) -> Result<CreatedEntity> {
        Ok(self.synthetic(EntityType::Epic, &epic.name, epic.external_id.as_deref()))
    }

    fn create_iteration(&self, iteration: &CreateIteration) -> Result<CreatedEntity> {
        Ok(self.synthetic(EntityType::Iteration, &iteration.name, None))
    }

    fn create_story(&self, story: &CreateStory) -> Result<CreatedEntity> {
        Ok(self.synthetic(EntityType::Story, &story.name, story.external_id.as_deref()))
    }

    fn create_stories(&self, stories: &[CreateStory]) -> Result<Vec<CreatedEntity>> {
        stories.iter().map(|s| self.create_story(s)).collect()
    }

    fn upload_file(&self, path: &Path) -> Result<UploadedFile> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("[DRY RUN] would upload {}", path.display());
        Ok(UploadedFile {
            id: self.next_id(),
            url: format!("https://mock-url/{}", filename),
            filename,
        })
    }

    fn delete_entity(&self, entity_type: EntityType, id: i64) -> Result<()> {
        info!("[DRY RUN] would delete {} {}", entity_type, id);
        Ok(())
    }

    fn create_story_comment(&self, story_id: i64, text: &str) -> Result<StoryComment> {
        info!("[DRY RUN] would comment on story {}: {}", story_id, text);
        Ok(StoryComment {
            id: self.next_id(),
            text: text.to_string(),
            created_at: Utc::now(),
        })
    }

    fn delete_story_comment(&self, story_id: i64, comment_id: i64) -> Result<()> {
        info!(
            "[DRY RUN] would delete comment {} on story {}",
            comment_id, story_id
        );
        Ok(())
    }

    fn add_labels(&self, update: &BulkLabelUpdate) -> Result<Vec<StorySummary>> {
        let names: Vec<&str> = update.labels_add.iter().map(|l| l.name.as_str()).collect();
        info!(
            "[DRY RUN] would add labels {:?} to {} stories",
            names,
            update.story_ids.len()
        );
        Ok(Vec::new())
    }
}
