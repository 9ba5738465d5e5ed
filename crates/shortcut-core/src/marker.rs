//! Labels and comment text that mark entities as created by an import.

use chrono::{DateTime, TimeZone};

/// Label attached to every story and epic created by any Pivotal import.
pub const PIVOTAL_TO_SHORTCUT_LABEL: &str = "pivotal->shortcut";

/// Label attached to chores that were `release` stories in Pivotal.
pub const PIVOTAL_RELEASE_TYPE_LABEL: &str = "pivotal-release";

/// Label attached to stories that had reviews in Pivotal.
pub const PIVOTAL_HAD_REVIEW_LABEL: &str = "pivotal-had-review";

/// Name of the label identifying a single import run.
///
/// The timestamp has minute resolution: `pivotal->shortcut 2024-03-01 14:05`.
pub fn run_label_name<Tz: TimeZone>(started_at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{} {}",
        PIVOTAL_TO_SHORTCUT_LABEL,
        started_at.format("%Y-%m-%d %H:%M")
    )
}

/// Returns `true` for the labels every import adds on its own.
pub fn is_import_label(name: &str, run_label: &str) -> bool {
    name == PIVOTAL_TO_SHORTCUT_LABEL || name == run_label
}

/// Text of the comment linking a Shortcut story back to its Pivotal story.
pub fn external_id_comment(external_id: &str) -> String {
    format!("Pivotal Tracker Id {}", external_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn run_label_has_minute_timestamp() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 14, 5, 59).unwrap();
        assert_eq!(run_label_name(&t), "pivotal->shortcut 2024-03-01 14:05");
    }

    #[test]
    fn import_labels_are_recognised() {
        let run = "pivotal->shortcut 2024-03-01 14:05";
        assert!(is_import_label(PIVOTAL_TO_SHORTCUT_LABEL, run));
        assert!(is_import_label(run, run));
        assert!(!is_import_label("billing", run));
    }

    #[test]
    fn external_id_comment_text() {
        assert_eq!(external_id_comment("1234"), "Pivotal Tracker Id 1234");
    }
}
