//! Parsing of Pivotal Tracker CSV export rows.
//!
//! A Pivotal export has one row per story. Most columns hold one value, but
//! owners, comments, tasks, reviews, blockers, pull requests and branches
//! repeat the same header once per value. [`parse_row`] folds a row into a
//! [`PivotalRow`] with those repeated columns collected in order.

use chrono::{NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Error type for row parsing failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("row is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid number in column '{column}': {value}")]
    InvalidNumber { column: String, value: String },

    #[error("invalid date in column '{column}': {value}")]
    InvalidDate { column: String, value: String },
}

/// Result alias for parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// A file attached to a Pivotal comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
}

impl Attachment {
    /// Returns `true` when the file should be rendered inline as an image.
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// A comment from the `comment` columns of the export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotalComment {
    pub text: String,

    /// Pivotal display name of the author, when the trailer was present.
    pub author: Option<String>,

    /// RFC 3339 timestamp, when the trailer was present.
    pub created_at: Option<String>,

    /// Attachments, filled in from the Pivotal dump database.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// The iteration a story was scheduled in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PivotalIteration {
    pub id: String,
    /// `YYYY-MM-DD`.
    pub start_date: String,
    /// `YYYY-MM-DD`.
    pub end_date: String,
}

/// One parsed row of the Pivotal export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotalRow {
    pub external_id: String,
    pub name: String,
    pub story_type: String,
    pub description: Option<String>,
    pub estimate: Option<i64>,
    pub priority: Option<String>,
    pub pt_state: Option<String>,
    pub labels: Vec<String>,
    pub requester: Option<String>,
    pub created_at: Option<String>,
    pub accepted_at: Option<String>,
    pub deadline: Option<String>,
    pub external_links: Vec<String>,
    pub iteration: Option<PivotalIteration>,

    // Repeated columns.
    pub owners: Vec<String>,
    pub comments: Vec<PivotalComment>,
    pub task_titles: Vec<String>,
    pub task_states: Vec<String>,
    pub reviewers: Vec<String>,
    pub review_types: Vec<String>,
    pub review_states: Vec<String>,
    pub blockers: Vec<String>,
    pub blocker_states: Vec<String>,
    pub pull_requests: Vec<String>,
    pub git_branches: Vec<String>,
}

/// Lower-cases and trims header names so lookups are case-insensitive.
pub fn normalize_header<'a>(header: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    header
        .into_iter()
        .map(|h| h.trim().to_lowercase())
        .collect()
}

/// Folds one export row into a [`PivotalRow`].
///
/// `header` must already be normalized with [`normalize_header`]. Unknown
/// columns are ignored; empty cells are treated as absent.
pub fn parse_row<'a>(header: &[String], fields: impl IntoIterator<Item = &'a str>) -> Result<PivotalRow> {
    let mut row = PivotalRow::default();
    let mut iteration_id = None;
    let mut iteration_start = None;
    let mut iteration_end = None;

    for (column, raw) in header.iter().zip(fields) {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        let owned = value.to_string();
        match column.as_str() {
            "id" => row.external_id = owned,
            "title" => row.name = owned,
            "type" => row.story_type = owned.to_lowercase(),
            "description" => row.description = Some(raw.to_string()),
            "estimate" => row.estimate = Some(parse_int(column, value)?),
            "priority" => row.priority = Some(owned),
            "current state" => row.pt_state = Some(owned.to_lowercase()),
            "labels" => row.labels = parse_labels(value),
            "requested by" => row.requester = Some(owned),
            "created at" => row.created_at = Some(parse_date_time(column, value)?),
            "accepted at" => row.accepted_at = Some(parse_date_time(column, value)?),
            "deadline" => row.deadline = Some(parse_date_time(column, value)?),
            "url" => row.external_links.push(owned),
            "iteration" => iteration_id = Some(owned),
            "iteration start" => iteration_start = Some(parse_date(column, value)?),
            "iteration end" => iteration_end = Some(parse_date(column, value)?),
            "owned by" => row.owners.push(owned),
            "comment" => row.comments.push(parse_comment(value)),
            "task" => row.task_titles.push(owned),
            "task status" => row.task_states.push(owned),
            "reviewer" => row.reviewers.push(owned),
            "review type" => row.review_types.push(owned),
            "review status" => row.review_states.push(owned),
            "blocker" => row.blockers.push(owned),
            "blocker status" => row.blocker_states.push(owned),
            "pull request" => row.pull_requests.push(owned),
            "git branch" => row.git_branches.push(owned),
            _ => {}
        }
    }

    if row.external_id.is_empty() {
        return Err(ParseError::MissingField("id"));
    }
    if row.name.is_empty() {
        return Err(ParseError::MissingField("title"));
    }
    if row.story_type.is_empty() {
        return Err(ParseError::MissingField("type"));
    }

    row.iteration = match (iteration_id, iteration_start, iteration_end) {
        (Some(id), Some(start_date), Some(end_date)) => Some(PivotalIteration {
            id,
            start_date,
            end_date,
        }),
        (Some(id), _, _) => {
            tracing::warn!(
                "story {} is in iteration {} without start/end dates; skipping iteration",
                row.external_id,
                id
            );
            None
        }
        _ => None,
    };

    Ok(row)
}

/// Splits the comma-separated `labels` cell.
pub fn parse_labels(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Splits a Pivotal comment cell of the form `text (Author Name - Mar 1, 2022)`.
///
/// When the trailer is missing or its date does not parse, the whole cell is
/// kept as the comment text.
pub fn parse_comment(value: &str) -> PivotalComment {
    let plain = PivotalComment {
        text: value.to_string(),
        ..Default::default()
    };

    let Some(body) = value.strip_suffix(')') else {
        return plain;
    };
    let Some(open) = body.rfind(" (") else {
        return plain;
    };
    let trailer = &body[open + 2..];
    let Some((author, date)) = trailer.rsplit_once(" - ") else {
        return plain;
    };
    let Some(created_at) = pivotal_date(date.trim()) else {
        return plain;
    };

    PivotalComment {
        text: body[..open].trim_end().to_string(),
        author: Some(author.trim().to_string()),
        created_at: Some(created_at),
        attachments: Vec::new(),
    }
}

fn parse_int(column: &str, value: &str) -> Result<i64> {
    // Pivotal writes point estimates as integers, but some exports carry "2.0".
    value
        .parse::<i64>()
        .ok()
        .or_else(|| {
            value
                .parse::<f64>()
                .ok()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        })
        .ok_or_else(|| ParseError::InvalidNumber {
            column: column.to_string(),
            value: value.to_string(),
        })
}

fn parse_date_time(column: &str, value: &str) -> Result<String> {
    pivotal_date(value).ok_or_else(|| ParseError::InvalidDate {
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn parse_date(column: &str, value: &str) -> Result<String> {
    let ts = parse_date_time(column, value)?;
    Ok(ts[..10].to_string())
}

/// Converts the date formats found in Pivotal exports to RFC 3339 (UTC).
fn pivotal_date(value: &str) -> Option<String> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        );
    }
    for fmt in ["%b %d, %Y %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(
                Utc.from_utc_datetime(&naive)
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        }
    }
    for fmt in ["%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return Some(
                Utc.from_utc_datetime(&naive)
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        }
    }
    None
}
