//! Building the [`MappingContext`] from configuration and the workspace.

use std::collections::HashMap;

use shortcut_api::ShortcutApi;
use shortcut_config::CookbookConfig;
use shortcut_config::mapping::{load_priorities, load_user_emails, load_workflow_states};
use shortcut_core::entity::Member;
use shortcut_core::mapping::MappingContext;
use tracing::{debug, warn};

use crate::error::Result;

/// Loads the mapping CSVs and resolves user emails to member ids.
pub fn build_mapping_context(
    config: &CookbookConfig,
    api: &dyn ShortcutApi,
    run_label: &str,
) -> Result<MappingContext> {
    let priorities = load_priorities(&config.priorities_csv_file)?;
    let workflow_states = load_workflow_states(&config.states_csv_file)?;
    let emails = load_user_emails(&config.users_csv_file)?;
    let members = api.list_members()?;
    let users = resolve_users(&emails, &members);

    let ctx = MappingContext {
        group_id: config.group_id.clone(),
        users,
        workflow_states,
        priorities,
        priority_custom_field_id: config.priority_custom_field_id.clone(),
        run_label: run_label.to_string(),
    };
    debug!("built mapping context {:?}", ctx);
    Ok(ctx)
}

/// Pivotal user name -> member id, matching emails case-insensitively.
///
/// Users whose email matches no member are dropped with a warning.
pub fn resolve_users(
    emails: &HashMap<String, String>,
    members: &[Member],
) -> HashMap<String, String> {
    let by_email: HashMap<String, &str> = members
        .iter()
        .filter_map(|m| {
            m.profile
                .email_address
                .as_deref()
                .map(|e| (e.trim().to_lowercase(), m.id.as_str()))
        })
        .collect();

    let mut users = HashMap::new();
    for (name, email) in emails {
        match by_email.get(&email.trim().to_lowercase()) {
            Some(id) => {
                users.insert(name.clone(), id.to_string());
            }
            None => warn!(
                "user '{}' <{}> is not a member of the workspace; their stories will be unassigned",
                name, email
            ),
        }
    }
    users
}
