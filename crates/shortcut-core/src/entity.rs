//! Shortcut resource types as returned by the REST API.
//!
//! Only the fields the cookbook workflows read are modelled; everything else
//! in the API responses is ignored during deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// The kinds of Shortcut entities an import can create (and later delete).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Story,
    Epic,
    Iteration,
    Label,
    File,
}

impl EntityType {
    /// All entity types, in creation order.
    pub const ALL: [EntityType; 5] = [
        EntityType::Label,
        EntityType::Epic,
        EntityType::Iteration,
        EntityType::File,
        EntityType::Story,
    ];

    /// Returns the string representation used in ledgers and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Epic => "epic",
            Self::Iteration => "iteration",
            Self::Label => "label",
            Self::File => "file",
        }
    }

    /// Position of this type when deleting a previous import.
    ///
    /// Deletion runs in reverse dependency order: files first (they hang off
    /// story comments), labels last.
    pub fn delete_rank(&self) -> u8 {
        match self {
            Self::File => 1,
            Self::Story => 2,
            Self::Iteration => 3,
            Self::Epic => 4,
            Self::Label => 5,
        }
    }

    /// API collection path for this entity type, e.g. `/stories`.
    pub fn collection_path(&self) -> &'static str {
        match self {
            Self::Story => "/stories",
            Self::Epic => "/epics",
            Self::Iteration => "/iterations",
            Self::Label => "/labels",
            Self::File => "/files",
        }
    }

    /// API path of a single entity, e.g. `/stories/42`.
    pub fn api_path(&self, id: i64) -> String {
        format!("{}/{}", self.collection_path(), id)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown entity type string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity type: {0}")]
pub struct UnknownEntityType(pub String);

impl FromStr for EntityType {
    type Err = UnknownEntityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "story" => Ok(Self::Story),
            "epic" => Ok(Self::Epic),
            "iteration" => Ok(Self::Iteration),
            "label" => Ok(Self::Label),
            "file" => Ok(Self::File),
            other => Err(UnknownEntityType(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Created entities
// ---------------------------------------------------------------------------

/// The part of a freshly created entity the importer keeps track of.
///
/// Every Shortcut create endpoint returns at least these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedEntity {
    pub id: i64,

    pub entity_type: EntityType,

    #[serde(default)]
    pub app_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// An uploaded file, as returned by `POST /files`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: i64,

    #[serde(default)]
    pub filename: String,

    #[serde(default)]
    pub url: String,
}

impl UploadedFile {
    /// Ledger view of the upload.
    pub fn as_created(&self) -> CreatedEntity {
        CreatedEntity {
            id: self.id,
            entity_type: EntityType::File,
            app_url: self.url.clone(),
            name: Some(self.filename.clone()),
            external_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

/// Profile details of a workspace member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub mention_name: String,

    #[serde(default)]
    pub email_address: Option<String>,
}

/// A workspace member, as returned by `GET /members`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Member UUID.
    pub id: String,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default)]
    pub profile: MemberProfile,
}

// ---------------------------------------------------------------------------
// Stories
// ---------------------------------------------------------------------------

/// A label reference as embedded in a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryLabel {
    #[serde(default)]
    pub id: Option<i64>,

    pub name: String,
}

/// The slim story shape returned by search and group listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySummary {
    pub id: i64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub story_type: String,

    #[serde(default)]
    pub app_url: String,

    #[serde(default)]
    pub external_id: Option<String>,

    #[serde(default)]
    pub labels: Vec<StoryLabel>,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl StorySummary {
    /// Returns `true` if the story already carries a label with this name.
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name == name)
    }
}

/// A comment on a story, as returned by `POST /stories/{id}/comments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryComment {
    pub id: i64,

    #[serde(default)]
    pub text: String,

    pub created_at: DateTime<Utc>,
}
