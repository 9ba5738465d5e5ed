//! The Pivotal Tracker import workflow.

use chrono::Local;
use shortcut_api::ShortcutApi;
use shortcut_config::CookbookConfig;
use shortcut_core::marker::run_label_name;
use tracing::info;

use crate::attachments::PivotalDump;
use crate::collector::{EntityCollector, read_pivotal_csv};
use crate::commit::{CommitOptions, ImportReport, commit};
use crate::context::build_mapping_context;
use crate::error::Result;

/// Logs how the client reacts to rate limiting.
pub fn log_rate_limit_explanation(config: &CookbookConfig) {
    info!(
        "Shortcut rate-limits API requests. When a request is throttled (HTTP 429) \
         it is retried after the server's Retry-After delay, or after {}ms doubling \
         up to 60s, at most {} times.",
        config.retry_base_delay_ms, config.max_retries
    );
}

/// Imports the Pivotal export named in `config`.
///
/// Pass a [`DryRunApi`](shortcut_api::DryRunApi) and `apply = false` for a
/// dry run.
pub fn run_import(
    config: &CookbookConfig,
    api: &dyn ShortcutApi,
    apply: bool,
) -> Result<ImportReport> {
    info!("Running in {} mode", if apply { "APPLY" } else { "DRY RUN" });

    let run_label = run_label_name(&Local::now());
    let ctx = build_mapping_context(config, api, &run_label)?;
    log_rate_limit_explanation(config);

    let dump = PivotalDump::open(&config.pivotal_dump_db)?;
    let mut collector = EntityCollector::new(&run_label);
    read_pivotal_csv(&config.pt_csv_file, dump.as_ref(), &ctx, &mut collector)?;

    info!("Summary of data to be imported");
    collector.planned().log();
    if !collector.invalid.is_empty() {
        info!("  invalid rows (not imported): {}", collector.invalid.len());
    }

    let report = commit(api, collector, &CommitOptions::from_config(config, apply))?;

    info!("Summary of created entities");
    report.created.log();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shortcut_api::{DryRunApi, MemoryApi};
    use shortcut_core::entity::{EntityType, Member, MemberProfile};
    use std::fs;
    use std::path::Path;

    fn workspace(dir: &Path) -> CookbookConfig {
        fs::write(
            dir.join("pt.csv"),
            "Id,Title,Type,Current State,Requested By,Owned By,Owned By,Labels,Comment\n\
             1,Login,feature,accepted,Ann,Ann,Bob,backend,\"Looks good (Ann - Mar 1, 2022)\"\n\
             2,Crash,bug,unstarted,Bob,,,,\n\
             3,Backend,epic,,,,,backend,\n\
             4,Mystery,chore,teleported,,,,,\n",
        )
        .unwrap();
        fs::write(
            dir.join("priorities.csv"),
            "pt_priority,shortcut_custom_field_value_id\n",
        )
        .unwrap();
        fs::write(
            dir.join("users.csv"),
            "pt_user_name,shortcut_user_email\nAnn,ann@example.com\nBob,bob@example.com\n",
        )
        .unwrap();
        fs::write(
            dir.join("states.csv"),
            "pt_state,shortcut_state_id\naccepted,500\nunstarted,400\n",
        )
        .unwrap();

        CookbookConfig {
            group_id: Some("g-1".into()),
            pt_csv_file: dir.join("pt.csv"),
            priorities_csv_file: dir.join("priorities.csv"),
            users_csv_file: dir.join("users.csv"),
            states_csv_file: dir.join("states.csv"),
            data_dir: dir.join("data"),
            pivotal_dump_db: dir.join("pivotal_dump.db"),
            ..Default::default()
        }
    }

    fn api_with_members() -> MemoryApi {
        let api = MemoryApi::new();
        api.add_member(Member {
            id: "m-ann".into(),
            disabled: false,
            profile: MemberProfile {
                name: "Ann".into(),
                mention_name: "ann".into(),
                email_address: Some("ann@example.com".into()),
            },
        });
        api
    }

    #[test]
    fn apply_imports_every_valid_row_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(dir.path());
        let api = api_with_members();

        let report = run_import(&config, &api, true).unwrap();
        assert_eq!(report.created.get(EntityType::Story), 2);
        assert_eq!(report.created.get(EntityType::Epic), 1);
        assert_eq!(report.invalid_rows, 1);

        let state = api.snapshot();
        let login = &state.story_payloads[0];
        assert_eq!(login.requested_by_id.as_deref(), Some("m-ann"));
        assert_eq!(login.owner_ids, vec!["m-ann".to_string()]);
        assert_eq!(login.workflow_state_id, Some(500));
        assert!(login.epic_id.is_some());
        assert_eq!(login.comments[0].author_id.as_deref(), Some("m-ann"));
        assert_eq!(state.epics[0].group_ids, vec!["g-1".to_string()]);

        let failed = fs::read_to_string(dir.path().join("data/failed_stories.csv")).unwrap();
        assert!(failed.contains("teleported"));
    }

    #[test]
    fn dry_run_leaves_the_workspace_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(dir.path());
        let api = DryRunApi::new(api_with_members());

        let report = run_import(&config, &api, false).unwrap();
        assert_eq!(report.created.get(EntityType::Story), 2);
        assert!(api.into_inner().snapshot().created.is_empty());
        assert!(!dir.path().join("data").exists());
    }
}
