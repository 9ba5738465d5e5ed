//! Request bodies for the Shortcut create and update endpoints.
//!
//! Optional fields are omitted from the serialized JSON so the API applies
//! its own defaults (e.g. the token owner as requester).

use serde::{Deserialize, Serialize};

/// Helper for `skip_serializing_if` on `Vec` fields.
fn is_empty_vec<T>(v: &Vec<T>) -> bool {
    v.is_empty()
}

/// A label reference by name; the API creates missing labels on the fly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelRef {
    pub name: String,
}

impl LabelRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Body of `POST /labels`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLabel {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A comment embedded in a story creation payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateComment {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A task (checklist item) embedded in a story creation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTask {
    pub description: String,

    #[serde(default)]
    pub complete: bool,
}

/// A custom field value assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub field_id: String,

    pub value_id: String,
}

/// Body of `POST /stories` and one element of `POST /stories/bulk`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateStory {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub external_links: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_state_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by_id: Option<String>,

    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub owner_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub follower_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub labels: Vec<LabelRef>,

    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub tasks: Vec<CreateTask>,

    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub comments: Vec<CreateComment>,

    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub custom_fields: Vec<CustomFieldValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epic_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_id: Option<i64>,
}

/// Body of `POST /epics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateEpic {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    #[serde(default)]
    pub group_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub labels: Vec<LabelRef>,
}

/// Body of `POST /iterations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIteration {
    pub name: String,

    /// `YYYY-MM-DD`.
    pub start_date: String,

    /// `YYYY-MM-DD`.
    pub end_date: String,
}

/// Body of `PUT /stories/bulk` when adding labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkLabelUpdate {
    pub story_ids: Vec<i64>,

    pub labels_add: Vec<LabelRef>,
}
