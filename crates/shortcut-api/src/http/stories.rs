//! Story, comment and search operations for [`HttpClient`].

use serde::Serialize;
use shortcut_core::entity::{CreatedEntity, EntityType, StoryComment, StorySummary};
use shortcut_core::payload::{BulkLabelUpdate, CreateStory};
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::http::client::HttpClient;
use crate::http::workspace::RawEntity;
use crate::pagination::{SearchPage, collect_cursor_pages, collect_offset_pages, resolve_next};

const BULK_PATH: &str = "/stories/bulk";
const SEARCH_PATH: &str = "/search/stories";

/// Page size for `GET /search/stories` (the API maximum).
pub const SEARCH_PAGE_SIZE: usize = 25;

/// Page size for `GET /groups/{id}/stories`.
pub const GROUP_PAGE_SIZE: usize = 1000;

#[derive(Serialize)]
struct BulkCreate<'a> {
    stories: &'a [CreateStory],
}

#[derive(Serialize)]
struct CommentBody<'a> {
    text: &'a str,
}

impl HttpClient {
    pub(crate) fn create_story_impl(&self, story: &CreateStory) -> Result<CreatedEntity> {
        let raw: RawEntity = self.post_json(EntityType::Story.collection_path(), story)?;
        Ok(raw.into_created(EntityType::Story))
    }

    pub(crate) fn create_stories_impl(
        &self,
        stories: &[CreateStory],
    ) -> Result<Vec<CreatedEntity>> {
        if stories.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<RawEntity> = self.post_json(BULK_PATH, &BulkCreate { stories })?;
        if raw.len() != stories.len() {
            return Err(ApiError::unexpected(
                BULK_PATH,
                format!("sent {} stories, got {} back", stories.len(), raw.len()),
            ));
        }
        Ok(raw
            .into_iter()
            .map(|r| r.into_created(EntityType::Story))
            .collect())
    }

    pub(crate) fn group_stories_impl(&self, group_id: &str) -> Result<Vec<StorySummary>> {
        let path = format!("/groups/{}/stories", group_id);
        let stories = collect_offset_pages(GROUP_PAGE_SIZE, |offset, limit| {
            self.get_json(
                &path,
                &[("limit", limit.to_string()), ("offset", offset.to_string())],
            )
        })?;
        debug!("group {} has {} stories", group_id, stories.len());
        Ok(stories)
    }

    pub(crate) fn search_stories_impl(&self, query: &str) -> Result<Vec<StorySummary>> {
        let stories = collect_cursor_pages(|cursor| -> Result<SearchPage<StorySummary>> {
            match cursor {
                None => self.get_json(
                    SEARCH_PATH,
                    &[
                        ("query", query.to_string()),
                        ("page_size", SEARCH_PAGE_SIZE.to_string()),
                    ],
                ),
                Some(next) => self.get_json(&resolve_next(&self.base_url, next), &[]),
            }
        })?;
        debug!("search matched {} stories", stories.len());
        Ok(stories)
    }

    pub(crate) fn create_story_comment_impl(
        &self,
        story_id: i64,
        text: &str,
    ) -> Result<StoryComment> {
        self.post_json(
            &format!("/stories/{}/comments", story_id),
            &CommentBody { text },
        )
    }

    pub(crate) fn delete_story_comment_impl(&self, story_id: i64, comment_id: i64) -> Result<()> {
        self.delete_path(&format!("/stories/{}/comments/{}", story_id, comment_id))
    }

    pub(crate) fn add_labels_impl(&self, update: &BulkLabelUpdate) -> Result<Vec<StorySummary>> {
        if update.story_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.put_json(BULK_PATH, update)
    }
}
