//! Workflows of the Shortcut cookbook.
//!
//! Every workflow takes a [`ShortcutApi`](shortcut_api::ShortcutApi) and an
//! `apply` flag. Without `apply` nothing is created, deleted or written to
//! the ledgers; the workflow only reports what it would do.
//!
//! - [`import`]: Pivotal Tracker CSV export → Shortcut
//! - [`delete`]: roll back an import from its ledger
//! - [`comments`]: add or remove "Pivotal Tracker Id" comments
//! - [`cycle_time`]: cycle-time report over a story search
//! - [`label`]: bulk-add a label to a story search

pub mod attachments;
pub mod collector;
pub mod comments;
pub mod commit;
pub mod context;
pub mod cycle_time;
pub mod delete;
pub mod error;
pub mod import;
pub mod label;
pub mod ledger;
pub mod slack;

pub use comments::{CommentsReport, DeleteCommentsReport, run_add_comments, run_delete_comments};
pub use commit::ImportReport;
pub use cycle_time::{CycleTimeReport, run_cycle_time};
pub use delete::{DeleteReport, run_delete};
pub use error::{ImportError, Result};
pub use import::{log_rate_limit_explanation, run_import};
pub use label::{LabelReport, run_add_label};
