//! Field mapping from Pivotal rows to Shortcut creation payloads.
//!
//! [`build_entity`] is the single place where Pivotal semantics are turned
//! into Shortcut ones. Linking stories to epics and iterations has to wait
//! until those have been created, so it lives in [`EpicLinks`] and
//! [`IterationLinks`].

use std::collections::HashMap;

use crate::entity::EntityType;
use crate::marker::{
    PIVOTAL_HAD_REVIEW_LABEL, PIVOTAL_RELEASE_TYPE_LABEL, PIVOTAL_TO_SHORTCUT_LABEL,
    is_import_label,
};
use crate::payload::{
    CreateComment, CreateEpic, CreateIteration, CreateStory, CreateTask, CustomFieldValue,
    LabelRef,
};
use crate::pivotal::{Attachment, PivotalIteration, PivotalRow};

/// Error type for rows that cannot be mapped to a Shortcut entity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MappingError {
    #[error("story {external_id}: Pivotal state '{state}' has no Shortcut workflow state (check states.csv)")]
    UnknownState { external_id: String, state: String },
}

/// Lookup tables built from the mapping CSVs and the workspace members.
#[derive(Debug, Clone, Default)]
pub struct MappingContext {
    /// Team (group) UUID assigned to every story and epic.
    pub group_id: Option<String>,

    /// Pivotal user display name -> Shortcut member UUID.
    pub users: HashMap<String, String>,

    /// Lower-cased Pivotal state -> Shortcut workflow state id.
    pub workflow_states: HashMap<String, Option<i64>>,

    /// Pivotal priority -> custom field value UUID.
    pub priorities: HashMap<String, Option<String>>,

    /// UUID of the Priority custom field.
    pub priority_custom_field_id: Option<String>,

    /// Name of this run's label.
    pub run_label: String,
}

/// A story ready to be created, plus what is needed to finish it later.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedStory {
    pub payload: CreateStory,

    /// Iteration the story belongs to in Pivotal.
    pub iteration: Option<PivotalIteration>,

    /// Attachments per comment, keyed by index into `payload.comments`.
    pub attachments: Vec<(usize, Vec<Attachment>)>,
}

/// An epic ready to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedEpic {
    pub payload: CreateEpic,
}

/// Result of mapping one Pivotal row.
#[derive(Debug, Clone, PartialEq)]
pub enum MappedEntity {
    Story(Box<MappedStory>),
    Epic(MappedEpic),
}

impl MappedEntity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Story(_) => EntityType::Story,
            Self::Epic(_) => EntityType::Epic,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Story(s) => &s.payload.name,
            Self::Epic(e) => &e.payload.name,
        }
    }
}

const REVIEW_COMMENT_PREFIX: &str = "\\[Pivotal Importer\\] Reviewers have been added as followers on this Shortcut Story.

The following table describes the state of their reviews when they were imported into Shortcut from Pivotal Tracker:

| Reviewer | Review Type | Review Status |
|---|---|---|";

fn escape_md_table(s: &str) -> String {
    s.replace('|', "\\|")
}

/// Builds the Markdown table comment listing a story's Pivotal reviews.
pub fn review_table_comment(row: &PivotalRow) -> String {
    let mut text = REVIEW_COMMENT_PREFIX.to_string();
    for ((reviewer, kind), status) in row
        .reviewers
        .iter()
        .zip(&row.review_types)
        .zip(&row.review_states)
    {
        text.push_str(&format!(
            "\n|{}|{}|{}|",
            escape_md_table(reviewer),
            escape_md_table(kind),
            escape_md_table(status)
        ));
    }
    text
}

/// Maps one parsed Pivotal row to the Shortcut entity that represents it.
pub fn build_entity(ctx: &MappingContext, row: &PivotalRow) -> Result<MappedEntity, MappingError> {
    let mut labels: Vec<LabelRef> = row.labels.iter().map(LabelRef::new).collect();
    labels.push(LabelRef::new(PIVOTAL_TO_SHORTCUT_LABEL));
    labels.push(LabelRef::new(&ctx.run_label));

    if row.story_type == "epic" {
        // Pivotal epics have no requester or owners; only the team carries over.
        return Ok(MappedEntity::Epic(MappedEpic {
            payload: CreateEpic {
                name: row.name.clone(),
                description: row.description.clone(),
                created_at: row.created_at.clone(),
                external_id: Some(row.external_id.clone()),
                group_ids: ctx.group_id.iter().cloned().collect(),
                labels,
            },
        }));
    }

    let mut story_type = row.story_type.clone();
    if story_type == "release" {
        story_type = "chore".to_string();
        labels.push(LabelRef::new(PIVOTAL_RELEASE_TYPE_LABEL));
    }

    let workflow_state_id = match &row.pt_state {
        Some(state) => match ctx.workflow_states.get(state) {
            Some(Some(id)) => Some(*id),
            _ => {
                return Err(MappingError::UnknownState {
                    external_id: row.external_id.clone(),
                    state: state.clone(),
                });
            }
        },
        None => None,
    };

    let tasks = row
        .task_titles
        .iter()
        .zip(&row.task_states)
        .map(|(title, state)| CreateTask {
            description: title.clone(),
            complete: state == "completed",
        })
        .collect();

    // An unknown requester falls back to the token owner on the API side.
    let requested_by_id = row
        .requester
        .as_ref()
        .and_then(|r| ctx.users.get(r))
        .cloned();

    let owner_ids = row
        .owners
        .iter()
        .filter_map(|o| ctx.users.get(o).cloned())
        .collect();

    let follower_ids = row
        .reviewers
        .iter()
        .filter_map(|r| ctx.users.get(r).cloned())
        .collect();

    let mut comments = Vec::with_capacity(row.comments.len() + 1);
    let mut attachments = Vec::new();
    for (i, comment) in row.comments.iter().enumerate() {
        comments.push(CreateComment {
            text: comment.text.clone(),
            author_id: comment
                .author
                .as_ref()
                .and_then(|a| ctx.users.get(a))
                .cloned(),
            created_at: comment.created_at.clone(),
        });
        if !comment.attachments.is_empty() {
            attachments.push((i, comment.attachments.clone()));
        }
    }

    if !row.reviewers.is_empty() {
        labels.push(LabelRef::new(PIVOTAL_HAD_REVIEW_LABEL));
        comments.push(CreateComment {
            text: review_table_comment(row),
            author_id: requested_by_id.clone(),
            created_at: None,
        });
    }

    let mut custom_fields = Vec::new();
    if let Some(priority) = &row.priority {
        match (
            ctx.priorities.get(priority),
            ctx.priority_custom_field_id.as_ref(),
        ) {
            (Some(Some(value_id)), Some(field_id)) => custom_fields.push(CustomFieldValue {
                field_id: field_id.clone(),
                value_id: value_id.clone(),
            }),
            (Some(Some(_)), None) => tracing::warn!(
                "story {}: priority_custom_field_id is not configured; dropping priority",
                row.external_id
            ),
            _ => tracing::warn!(
                "story {}: priority '{}' is not mapped in priorities.csv; dropping priority",
                row.external_id,
                priority
            ),
        }
    }

    Ok(MappedEntity::Story(Box::new(MappedStory {
        payload: CreateStory {
            name: row.name.clone(),
            story_type: Some(story_type),
            description: row.description.clone(),
            created_at: row.created_at.clone(),
            deadline: row.deadline.clone(),
            estimate: row.estimate,
            external_id: Some(row.external_id.clone()),
            external_links: row.external_links.clone(),
            group_id: ctx.group_id.clone(),
            workflow_state_id,
            requested_by_id,
            owner_ids,
            follower_ids,
            labels,
            tasks,
            comments,
            custom_fields,
            epic_id: None,
            iteration_id: None,
        },
        iteration: row.iteration.clone(),
        attachments,
    })))
}

/// Payload for the Shortcut iteration standing in for a Pivotal one.
pub fn iteration_payload(iteration: &PivotalIteration) -> CreateIteration {
    CreateIteration {
        name: format!("PT {}", iteration.id),
        start_date: iteration.start_date.clone(),
        end_date: iteration.end_date.clone(),
    }
}

// ---------------------------------------------------------------------------
// Linking
// ---------------------------------------------------------------------------

/// Maps epic labels to created epic ids.
///
/// In Pivotal a story belongs to an epic by carrying the epic's label.
#[derive(Debug, Clone, Default)]
pub struct EpicLinks {
    by_label: HashMap<String, i64>,
}

impl EpicLinks {
    /// Builds the label map from created epics, ignoring the import labels.
    pub fn new<'a>(epics: impl IntoIterator<Item = (&'a CreateEpic, i64)>, run_label: &str) -> Self {
        let mut by_label = HashMap::new();
        for (epic, id) in epics {
            for label in &epic.labels {
                if !is_import_label(&label.name, run_label) {
                    by_label.insert(label.name.clone(), id);
                }
            }
        }
        Self { by_label }
    }

    /// Sets `epic_id` on the story if one of its labels belongs to an epic.
    pub fn link(&self, story: &mut CreateStory) {
        for label in &story.labels {
            if let Some(id) = self.by_label.get(&label.name) {
                story.epic_id = Some(*id);
            }
        }
    }
}

/// Maps Pivotal iteration ids to created Shortcut iteration ids.
#[derive(Debug, Clone, Default)]
pub struct IterationLinks {
    by_pt_id: HashMap<String, i64>,
}

impl IterationLinks {
    pub fn new<'a>(iterations: impl IntoIterator<Item = (&'a PivotalIteration, i64)>) -> Self {
        Self {
            by_pt_id: iterations
                .into_iter()
                .map(|(it, id)| (it.id.clone(), id))
                .collect(),
        }
    }

    /// Sets `iteration_id` on the story from its Pivotal iteration.
    pub fn link(&self, story: &mut MappedStory) {
        let Some(iteration) = &story.iteration else {
            return;
        };
        match self.by_pt_id.get(&iteration.id) {
            Some(id) => story.payload.iteration_id = Some(*id),
            None => tracing::warn!(
                "story {}: iteration PT {} was not created; leaving story unscheduled",
                story.payload.external_id.as_deref().unwrap_or("?"),
                iteration.id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivotal::PivotalComment;
    use pretty_assertions::assert_eq;

    const RUN: &str = "pivotal->shortcut 2024-03-01 14:05";

    fn ctx() -> MappingContext {
        MappingContext {
            group_id: Some("group-uuid".into()),
            users: HashMap::from([
                ("Ann".to_string(), "ann-uuid".to_string()),
                ("Bob".to_string(), "bob-uuid".to_string()),
            ]),
            workflow_states: HashMap::from([
                ("started".to_string(), Some(500)),
                ("accepted".to_string(), Some(503)),
                ("rejected".to_string(), None),
            ]),
            priorities: HashMap::from([("p1 - high".to_string(), Some("high-uuid".to_string()))]),
            priority_custom_field_id: Some("priority-field".into()),
            run_label: RUN.into(),
        }
    }

    fn row(story_type: &str) -> PivotalRow {
        PivotalRow {
            external_id: "101".into(),
            name: "Login".into(),
            story_type: story_type.into(),
            ..Default::default()
        }
    }

    fn story(entity: MappedEntity) -> MappedStory {
        match entity {
            MappedEntity::Story(s) => *s,
            other => panic!("expected story, got {:?}", other),
        }
    }

    fn label_names(labels: &[LabelRef]) -> Vec<&str> {
        labels.iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn epic_rows_become_epics() {
        let mut r = row("epic");
        r.labels = vec!["billing".into()];
        let MappedEntity::Epic(epic) = build_entity(&ctx(), &r).unwrap() else {
            panic!("expected epic");
        };
        assert_eq!(epic.payload.group_ids, vec!["group-uuid"]);
        assert_eq!(
            label_names(&epic.payload.labels),
            vec!["billing", PIVOTAL_TO_SHORTCUT_LABEL, RUN]
        );
    }

    #[test]
    fn epic_without_group_has_empty_group_ids() {
        let mut c = ctx();
        c.group_id = None;
        let MappedEntity::Epic(epic) = build_entity(&c, &row("epic")).unwrap() else {
            panic!("expected epic");
        };
        assert!(epic.payload.group_ids.is_empty());
    }

    #[test]
    fn release_becomes_labelled_chore() {
        let s = story(build_entity(&ctx(), &row("release")).unwrap());
        assert_eq!(s.payload.story_type.as_deref(), Some("chore"));
        assert!(label_names(&s.payload.labels).contains(&PIVOTAL_RELEASE_TYPE_LABEL));
    }

    #[test]
    fn maps_state_users_tasks_and_priority() {
        let mut r = row("feature");
        r.pt_state = Some("started".into());
        r.requester = Some("Ann".into());
        r.owners = vec!["Bob".into(), "Ghost".into()];
        r.task_titles = vec!["a".into(), "b".into()];
        r.task_states = vec!["completed".into(), "not completed".into()];
        r.priority = Some("p1 - high".into());

        let s = story(build_entity(&ctx(), &r).unwrap());
        assert_eq!(s.payload.workflow_state_id, Some(500));
        assert_eq!(s.payload.requested_by_id.as_deref(), Some("ann-uuid"));
        assert_eq!(s.payload.owner_ids, vec!["bob-uuid"]);
        assert_eq!(s.payload.group_id.as_deref(), Some("group-uuid"));
        assert_eq!(
            s.payload.tasks,
            vec![
                CreateTask { description: "a".into(), complete: true },
                CreateTask { description: "b".into(), complete: false },
            ]
        );
        assert_eq!(
            s.payload.custom_fields,
            vec![CustomFieldValue {
                field_id: "priority-field".into(),
                value_id: "high-uuid".into(),
            }]
        );
    }

    #[test]
    fn unmapped_state_rejects_row() {
        let mut r = row("bug");
        r.pt_state = Some("rejected".into());
        assert_eq!(
            build_entity(&ctx(), &r),
            Err(MappingError::UnknownState {
                external_id: "101".into(),
                state: "rejected".into(),
            })
        );
    }

    #[test]
    fn unmapped_priority_is_dropped() {
        let mut r = row("bug");
        r.priority = Some("p9".into());
        let s = story(build_entity(&ctx(), &r).unwrap());
        assert!(s.payload.custom_fields.is_empty());
    }

    #[test]
    fn reviewers_become_followers_label_and_table_comment() {
        let mut r = row("feature");
        r.requester = Some("Ann".into());
        r.reviewers = vec!["Bob".into(), "Pipe|Name".into()];
        r.review_types = vec!["code".into(), "design".into()];
        r.review_states = vec!["pass".into(), "unstarted".into()];

        let s = story(build_entity(&ctx(), &r).unwrap());
        assert_eq!(s.payload.follower_ids, vec!["bob-uuid"]);
        assert!(label_names(&s.payload.labels).contains(&PIVOTAL_HAD_REVIEW_LABEL));

        let comment = s.payload.comments.last().unwrap();
        assert_eq!(comment.author_id.as_deref(), Some("ann-uuid"));
        assert!(comment.text.starts_with("\\[Pivotal Importer\\]"));
        assert!(comment.text.ends_with("\n|Bob|code|pass|\n|Pipe\\|Name|design|unstarted|"));
    }

    #[test]
    fn comments_keep_author_and_attachments() {
        let mut r = row("chore");
        r.comments = vec![
            PivotalComment {
                text: "hi".into(),
                author: Some("Bob".into()),
                created_at: Some("2022-03-01T00:00:00Z".into()),
                attachments: vec![],
            },
            PivotalComment {
                text: "see file".into(),
                author: Some("Nobody".into()),
                created_at: None,
                attachments: vec![Attachment {
                    filename: "a.png".into(),
                    content_type: "image/png".into(),
                }],
            },
        ];
        let s = story(build_entity(&ctx(), &r).unwrap());
        assert_eq!(s.payload.comments[0].author_id.as_deref(), Some("bob-uuid"));
        assert_eq!(s.payload.comments[1].author_id, None);
        assert_eq!(s.attachments.len(), 1);
        assert_eq!(s.attachments[0].0, 1);
    }

    #[test]
    fn epic_links_use_non_import_labels() {
        let epic = CreateEpic {
            name: "Billing".into(),
            labels: vec![
                LabelRef::new("billing"),
                LabelRef::new(PIVOTAL_TO_SHORTCUT_LABEL),
                LabelRef::new(RUN),
            ],
            ..Default::default()
        };
        let links = EpicLinks::new([(&epic, 42)], RUN);

        let mut linked = CreateStory {
            labels: vec![LabelRef::new("billing"), LabelRef::new(PIVOTAL_TO_SHORTCUT_LABEL)],
            ..Default::default()
        };
        links.link(&mut linked);
        assert_eq!(linked.epic_id, Some(42));

        let mut unlinked = CreateStory {
            labels: vec![LabelRef::new(PIVOTAL_TO_SHORTCUT_LABEL), LabelRef::new(RUN)],
            ..Default::default()
        };
        links.link(&mut unlinked);
        assert_eq!(unlinked.epic_id, None);
    }

    #[test]
    fn iteration_links_set_iteration_id() {
        let it = PivotalIteration {
            id: "7".into(),
            start_date: "2023-01-02".into(),
            end_date: "2023-01-16".into(),
        };
        assert_eq!(iteration_payload(&it).name, "PT 7");

        let links = IterationLinks::new([(&it, 9)]);
        let mut s = story(build_entity(&ctx(), &row("feature")).unwrap());
        s.iteration = Some(it);
        links.link(&mut s);
        assert_eq!(s.payload.iteration_id, Some(9));
    }
}
