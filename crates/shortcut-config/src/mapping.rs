//! Loading of the mapping CSVs that translate Pivotal values to Shortcut ids.
//!
//! Each file has a header row; a row with an empty target cell maps its key
//! to "no value" rather than being dropped, so lookups can tell an unmapped
//! value from an unknown one.

use std::collections::HashMap;
use std::path::Path;

use crate::config::{ConfigError, Result};

/// Reads `path` and maps the `from_key` column to the `to_key` column.
///
/// # Errors
///
/// Returns [`ConfigError::Csv`] if the file cannot be read or parsed and
/// [`ConfigError::MissingColumn`] if either column is absent.
pub fn load_mapping_csv(
    path: &Path,
    from_key: &str,
    to_key: &str,
) -> Result<HashMap<String, Option<String>>> {
    let csv_err = |source| ConfigError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ConfigError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };
    let from_idx = column(from_key)?;
    let to_idx = column(to_key)?;

    let mut map = HashMap::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let Some(key) = record.get(from_idx).map(str::trim).filter(|k| !k.is_empty()) else {
            continue;
        };
        let value = record
            .get(to_idx)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        map.insert(key.to_string(), value);
    }
    Ok(map)
}

/// Pivotal priority -> Shortcut custom field value id.
pub fn load_priorities(path: &Path) -> Result<HashMap<String, Option<String>>> {
    tracing::debug!("loading priorities from {}", path.display());
    load_mapping_csv(path, "pt_priority", "shortcut_custom_field_value_id")
}

/// Pivotal user display name -> Shortcut member email.
///
/// Users without an email are dropped: they cannot be resolved to a member.
pub fn load_user_emails(path: &Path) -> Result<HashMap<String, String>> {
    tracing::debug!("loading users from {}", path.display());
    Ok(load_mapping_csv(path, "pt_user_name", "shortcut_user_email")?
        .into_iter()
        .filter_map(|(user, email)| email.map(|e| (user, e)))
        .collect())
}

/// Lower-cased Pivotal state -> Shortcut workflow state id.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if a state id is not an integer.
pub fn load_workflow_states(path: &Path) -> Result<HashMap<String, Option<i64>>> {
    tracing::debug!("loading workflow states from {}", path.display());
    load_mapping_csv(path, "pt_state", "shortcut_state_id")?
        .into_iter()
        .map(|(state, id)| {
            let id = id
                .map(|v| {
                    v.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
                        key: format!("shortcut_state_id for '{}'", state),
                        reason: format!("'{}' is not an integer", v),
                    })
                })
                .transpose()?;
            Ok((state.to_lowercase(), id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn empty_target_maps_to_none() {
        let f = write_csv("pt_priority,shortcut_custom_field_value_id\np1 - High,abc\np3 - Low,\n");
        let map = load_priorities(f.path()).unwrap();
        assert_eq!(map.get("p1 - High"), Some(&Some("abc".to_string())));
        assert_eq!(map.get("p3 - Low"), Some(&None));
        assert_eq!(map.get("p2 - Medium"), None);
    }

    #[test]
    fn users_without_email_are_dropped() {
        let f = write_csv("pt_user_name,shortcut_user_email\nAnn,ann@example.com\nBob,\n");
        let map = load_user_emails(f.path()).unwrap();
        assert_eq!(
            map,
            HashMap::from([("Ann".to_string(), "ann@example.com".to_string())])
        );
    }

    #[test]
    fn workflow_states_parse_ids_and_lowercase_keys() {
        let f = write_csv("pt_state,shortcut_state_id\nStarted,500\nrejected,\n");
        let map = load_workflow_states(f.path()).unwrap();
        assert_eq!(map.get("started"), Some(&Some(500)));
        assert_eq!(map.get("rejected"), Some(&None));
    }

    #[test]
    fn non_integer_state_id_is_rejected() {
        let f = write_csv("pt_state,shortcut_state_id\nstarted,abc\n");
        assert!(matches!(
            load_workflow_states(f.path()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn missing_column_is_reported() {
        let f = write_csv("pt_state,state\nstarted,1\n");
        match load_workflow_states(f.path()) {
            Err(ConfigError::MissingColumn { column, .. }) => {
                assert_eq!(column, "shortcut_state_id")
            }
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }
}
