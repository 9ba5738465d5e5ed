//! Client for the Shortcut REST API (v3).
//!
//! Provides the [`ShortcutApi`] trait, an HTTP implementation
//! ([`HttpClient`]), a [`DryRunApi`] wrapper that never mutates anything and
//! an in-memory backend ([`MemoryApi`]).

pub mod dry_run;
pub mod error;
pub mod http;
pub mod memory;
pub mod pagination;
pub mod retry;
pub mod traits;

// Re-exports for convenience.
pub use dry_run::DryRunApi;
pub use error::ApiError;
pub use http::{DEFAULT_BASE_URL, HttpClient};
pub use memory::{MemoryApi, MemoryState};
pub use retry::RetryPolicy;
pub use traits::ShortcutApi;

// ---------------------------------------------------------------------------
// ShortcutApi trait implementation for HttpClient
// ---------------------------------------------------------------------------

use std::path::Path;

use shortcut_core::entity::{
    CreatedEntity, EntityType, Member, StoryComment, StorySummary, UploadedFile,
};
use shortcut_core::payload::{
    BulkLabelUpdate, CreateEpic, CreateIteration, CreateLabel, CreateStory,
};

use crate::error::Result;

impl ShortcutApi for HttpClient {
    fn list_members(&self) -> Result<Vec<Member>> {
        self.list_members_impl()
    }

    fn group_stories(&self, group_id: &str) -> Result<Vec<StorySummary>> {
        self.group_stories_impl(group_id)
    }

    fn search_stories(&self, query: &str) -> Result<Vec<StorySummary>> {
        self.search_stories_impl(query)
    }

    fn create_label(&self, label: &CreateLabel) -> Result<CreatedEntity> {
        self.create_label_impl(label)
    }

    fn create_epic(&self, epic: &CreateEpic) -> Result<CreatedEntity> {
        self.create_epic_impl(epic)
    }

    fn create_iteration(&self, iteration: &CreateIteration) -> Result<CreatedEntity> {
        self.create_iteration_impl(iteration)
    }

    fn create_story(&self, story: &CreateStory) -> Result<CreatedEntity> {
        self.create_story_impl(story)
    }

    fn create_stories(&self, stories: &[CreateStory]) -> Result<Vec<CreatedEntity>> {
        self.create_stories_impl(stories)
    }

    fn upload_file(&self, path: &Path) -> Result<UploadedFile> {
        self.upload_file_impl(path)
    }

    fn delete_entity(&self, entity_type: EntityType, id: i64) -> Result<()> {
        self.delete_entity_impl(entity_type, id)
    }

    fn create_story_comment(&self, story_id: i64, text: &str) -> Result<StoryComment> {
        self.create_story_comment_impl(story_id, text)
    }

    fn delete_story_comment(&self, story_id: i64, comment_id: i64) -> Result<()> {
        self.delete_story_comment_impl(story_id, comment_id)
    }

    fn add_labels(&self, update: &BulkLabelUpdate) -> Result<Vec<StorySummary>> {
        self.add_labels_impl(update)
    }
}

// Blanket impl so workflows can take `&A` or `Box<dyn ShortcutApi>`.
impl<T: ShortcutApi + ?Sized> ShortcutApi for &T {
    fn list_members(&self) -> Result<Vec<Member>> {
        (**self).list_members()
    }

    fn group_stories(&self, group_id: &str) -> Result<Vec<StorySummary>> {
        (**self).group_stories(group_id)
    }

    fn search_stories(&self, query: &str) -> Result<Vec<StorySummary>> {
        (**self).search_stories(query)
    }

    fn create_label(&self, label: &CreateLabel) -> Result<CreatedEntity> {
        (**self).create_label(label)
    }

    fn create_epic(&self, epic: &CreateEpic) -> Result<CreatedEntity> {
        (**self).create_epic(epic)
    }

    fn create_iteration(&self, iteration: &CreateIteration) -> Result<CreatedEntity> {
        (**self).create_iteration(iteration)
    }

    fn create_story(&self, story: &CreateStory) -> Result<CreatedEntity> {
        (**self).create_story(story)
    }

    fn create_stories(&self, stories: &[CreateStory]) -> Result<Vec<CreatedEntity>> {
        (**self).create_stories(stories)
    }

    fn upload_file(&self, path: &Path) -> Result<UploadedFile> {
        (**self).upload_file(path)
    }

    fn delete_entity(&self, entity_type: EntityType, id: i64) -> Result<()> {
        (**self).delete_entity(entity_type, id)
    }

    fn create_story_comment(&self, story_id: i64, text: &str) -> Result<StoryComment> {
        (**self).create_story_comment(story_id, text)
    }

    fn delete_story_comment(&self, story_id: i64, comment_id: i64) -> Result<()> {
        (**self).delete_story_comment(story_id, comment_id)
    }

    fn add_labels(&self, update: &BulkLabelUpdate) -> Result<Vec<StorySummary>> {
        (**self).add_labels(update)
    }
}
