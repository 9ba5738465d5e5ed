//! The `ShortcutApi` trait -- the public API the workflows are written against.
//!
//! Consumers depend on this trait rather than on [`HttpClient`] so that the
//! dry-run wrapper and in-memory backends can be substituted.
//!
//! [`HttpClient`]: crate::http::HttpClient

use std::path::Path;

use shortcut_core::entity::{
    CreatedEntity, EntityType, Member, StoryComment, StorySummary, UploadedFile,
};
use shortcut_core::payload::{
    BulkLabelUpdate, CreateEpic, CreateIteration, CreateLabel, CreateStory,
};

use crate::error::Result;

/// The Shortcut endpoints used by the cookbook workflows.
///
/// Methods under "Writes" mutate the workspace; [`DryRunApi`] answers them
/// without contacting the API.
///
/// [`DryRunApi`]: crate::dry_run::DryRunApi
pub trait ShortcutApi {
    // -- Reads ---------------------------------------------------------------

    /// Returns every member of the workspace.
    fn list_members(&self) -> Result<Vec<Member>>;

    /// Returns every story owned by a team, following offset pagination.
    fn group_stories(&self, group_id: &str) -> Result<Vec<StorySummary>>;

    /// Runs a story search, following cursor pagination to the end.
    fn search_stories(&self, query: &str) -> Result<Vec<StorySummary>>;

    // -- Writes --------------------------------------------------------------

    /// Creates a label.
    fn create_label(&self, label: &CreateLabel) -> Result<CreatedEntity>;

    /// Creates an epic.
    fn create_epic(&self, epic: &CreateEpic) -> Result<CreatedEntity>;

    /// Creates an iteration.
    fn create_iteration(&self, iteration: &CreateIteration) -> Result<CreatedEntity>;

    /// Creates a single story.
    fn create_story(&self, story: &CreateStory) -> Result<CreatedEntity>;

    /// Creates several stories in one request.
    ///
    /// The result is in the same order as the input.
    fn create_stories(&self, stories: &[CreateStory]) -> Result<Vec<CreatedEntity>>;

    /// Uploads a local file and returns the stored file.
    fn upload_file(&self, path: &Path) -> Result<UploadedFile>;

    /// Deletes an entity by type and id.
    fn delete_entity(&self, entity_type: EntityType, id: i64) -> Result<()>;

    /// Adds a comment to a story.
    fn create_story_comment(&self, story_id: i64, text: &str) -> Result<StoryComment>;

    /// Deletes a comment from a story.
    fn delete_story_comment(&self, story_id: i64, comment_id: i64) -> Result<()>;

    /// Adds labels to several stories at once.
    fn add_labels(&self, update: &BulkLabelUpdate) -> Result<Vec<StorySummary>>;
}
