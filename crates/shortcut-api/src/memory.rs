//! [`MemoryApi`] -- an in-process [`ShortcutApi`] backed by plain vectors.
//!
//! Useful for exercising the workflows without a network: every call is
//! recorded, created stories become searchable, and individual failures can
//! be switched on through [`MemoryState`].

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use shortcut_core::entity::{
    CreatedEntity, EntityType, Member, StoryComment, StoryLabel, StorySummary, UploadedFile,
};
use shortcut_core::payload::{
    BulkLabelUpdate, CreateEpic, CreateIteration, CreateLabel, CreateStory,
};

use crate::error::{ApiError, Result};
use crate::traits::ShortcutApi;

/// First id handed out by [`MemoryApi`].
const FIRST_ID: i64 = 1000;

/// Everything a [`MemoryApi`] has seen, plus its failure switches.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    next_id: i64,

    pub members: Vec<Member>,
    /// Stories visible to search and group listing.
    pub stories: Vec<StorySummary>,

    pub created: Vec<CreatedEntity>,
    pub labels: Vec<CreateLabel>,
    pub epics: Vec<CreateEpic>,
    pub iterations: Vec<CreateIteration>,
    pub story_payloads: Vec<CreateStory>,
    /// Sizes of the bulk create requests, in order.
    pub bulk_requests: Vec<usize>,
    pub uploads: Vec<PathBuf>,
    pub deleted: Vec<(EntityType, i64)>,
    pub comments: Vec<(i64, StoryComment)>,
    pub deleted_comments: Vec<(i64, i64)>,
    pub label_updates: Vec<BulkLabelUpdate>,
    pub searches: Vec<String>,

    /// Reject every bulk story request.
    pub fail_bulk: bool,
    /// Reject single-story creation for these names.
    pub fail_story_names: HashSet<String>,
    /// Reject every upload.
    pub fail_uploads: bool,
    /// Answer deletes of these entities with 404.
    pub missing: HashSet<(EntityType, i64)>,
    /// Answer comment creation on these stories with an error.
    pub fail_comment_stories: HashSet<i64>,
    /// Answer deletes and comment calls touching these ids with 401.
    pub unauthorized_ids: HashSet<i64>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        let id = FIRST_ID + self.next_id;
        self.next_id += 1;
        id
    }

    fn record(&mut self, entity_type: EntityType, name: &str, external_id: Option<&str>) -> CreatedEntity {
        let id = self.next_id();
        let created = CreatedEntity {
            id,
            entity_type,
            app_url: format!("https://app.shortcut.com/memory/{}/{}", entity_type, id),
            name: Some(name.to_string()),
            external_id: external_id.map(str::to_string),
        };
        self.created.push(created.clone());
        created
    }

    fn insert_story(&mut self, story: &CreateStory) -> CreatedEntity {
        let created = self.record(EntityType::Story, &story.name, story.external_id.as_deref());
        self.story_payloads.push(story.clone());
        self.stories.push(StorySummary {
            id: created.id,
            name: story.name.clone(),
            story_type: story.story_type.clone().unwrap_or_default(),
            app_url: created.app_url.clone(),
            external_id: story.external_id.clone(),
            labels: story
                .labels
                .iter()
                .map(|l| StoryLabel {
                    id: None,
                    name: l.name.clone(),
                })
                .collect(),
            started_at: None,
            completed_at: None,
        });
        created
    }
}

/// In-memory [`ShortcutApi`].
#[derive(Debug, Default)]
pub struct MemoryApi {
    state: RefCell<MemoryState>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an existing story to the workspace.
    pub fn add_story(&self, story: StorySummary) {
        self.state.borrow_mut().stories.push(story);
    }

    /// Adds a workspace member.
    pub fn add_member(&self, member: Member) {
        self.state.borrow_mut().members.push(member);
    }

    /// Mutates the state, e.g. to switch failures on.
    pub fn configure(&self, f: impl FnOnce(&mut MemoryState)) {
        f(&mut self.state.borrow_mut());
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> MemoryState {
        self.state.borrow().clone()
    }
}

impl ShortcutApi for MemoryApi {
    fn list_members(&self) -> Result<Vec<Member>> {
        Ok(self.state.borrow().members.clone())
    }

    fn group_stories(&self, _group_id: &str) -> Result<Vec<StorySummary>> {
        Ok(self.state.borrow().stories.clone())
    }

    /// The query is recorded, not evaluated: every story matches.
    fn search_stories(&self, query: &str) -> Result<Vec<StorySummary>> {
        let mut state = self.state.borrow_mut();
        state.searches.push(query.to_string());
        Ok(state.stories.clone())
    }

    fn create_label(&self, label: &CreateLabel) -> Result<CreatedEntity> {
        let mut state = self.state.borrow_mut();
        state.labels.push(label.clone());
        Ok(state.record(EntityType::Label, &label.name, None))
    }

    fn create_epic(&self, epic: &CreateEpic) -> Result<CreatedEntity> {
        let mut state = self.state.borrow_mut();
        state.epics.push(epic.clone());
        Ok(state.record(EntityType::Epic, &epic.name, epic.external_id.as_deref()))
    }

    fn create_iteration(&self, iteration: &CreateIteration) -> Result<CreatedEntity> {
        let mut state = self.state.borrow_mut();
        state.iterations.push(iteration.clone());
        Ok(state.record(EntityType::Iteration, &iteration.name, None))
    }

    fn create_story(&self, story: &CreateStory) -> Result<CreatedEntity> {
        let mut state = self.state.borrow_mut();
        if state.fail_story_names.contains(&story.name) {
            return Err(ApiError::status(
                "POST",
                "/stories",
                400,
                &format!("rejected story '{}'", story.name),
            ));
        }
        Ok(state.insert_story(story))
    }

    fn create_stories(&self, stories: &[CreateStory]) -> Result<Vec<CreatedEntity>> {
        let mut state = self.state.borrow_mut();
        state.bulk_requests.push(stories.len());
        if state.fail_bulk {
            return Err(ApiError::status("POST", "/stories/bulk", 400, "bulk rejected"));
        }
        Ok(stories.iter().map(|s| state.insert_story(s)).collect())
    }

    fn upload_file(&self, path: &Path) -> Result<UploadedFile> {
        let mut state = self.state.borrow_mut();
        if state.fail_uploads {
            return Err(ApiError::status("POST", "/files", 500, "upload rejected"));
        }
        state.uploads.push(path.to_path_buf());
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let created = state.record(EntityType::File, &filename, None);
        Ok(UploadedFile {
            id: created.id,
            url: format!("https://files.shortcut.test/{}/{}", created.id, filename),
            filename,
        })
    }

    fn delete_entity(&self, entity_type: EntityType, id: i64) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.unauthorized_ids.contains(&id) {
            return Err(ApiError::Unauthorized);
        }
        if state.missing.contains(&(entity_type, id)) {
            return Err(ApiError::NotFound {
                path: entity_type.api_path(id),
            });
        }
        state.deleted.push((entity_type, id));
        if entity_type == EntityType::Story {
            state.stories.retain(|s| s.id != id);
        }
        Ok(())
    }

    fn create_story_comment(&self, story_id: i64, text: &str) -> Result<StoryComment> {
        let mut state = self.state.borrow_mut();
        if state.unauthorized_ids.contains(&story_id) {
            return Err(ApiError::Unauthorized);
        }
        if state.fail_comment_stories.contains(&story_id) {
            return Err(ApiError::status(
                "POST",
                format!("/stories/{}/comments", story_id),
                422,
                "comment rejected",
            ));
        }
        let comment = StoryComment {
            id: state.next_id(),
            text: text.to_string(),
            created_at: Utc::now(),
        };
        state.comments.push((story_id, comment.clone()));
        Ok(comment)
    }

    fn delete_story_comment(&self, story_id: i64, comment_id: i64) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.unauthorized_ids.contains(&story_id) {
            return Err(ApiError::Unauthorized);
        }
        let before = state.comments.len();
        state
            .comments
            .retain(|(s, c)| !(*s == story_id && c.id == comment_id));
        if state.comments.len() == before {
            return Err(ApiError::NotFound {
                path: format!("/stories/{}/comments/{}", story_id, comment_id),
            });
        }
        state.deleted_comments.push((story_id, comment_id));
        Ok(())
    }

    fn add_labels(&self, update: &BulkLabelUpdate) -> Result<Vec<StorySummary>> {
        let mut state = self.state.borrow_mut();
        state.label_updates.push(update.clone());
        let mut updated = Vec::new();
        for story in state
            .stories
            .iter_mut()
            .filter(|s| update.story_ids.contains(&s.id))
        {
            for label in &update.labels_add {
                if !story.has_label(&label.name) {
                    story.labels.push(StoryLabel {
                        id: None,
                        name: label.name.clone(),
                    });
                }
            }
            updated.push(story.clone());
        }
        Ok(updated)
    }
}
