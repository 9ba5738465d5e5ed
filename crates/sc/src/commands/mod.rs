//! Command handlers, one module per subcommand.

pub mod comments;
pub mod completion;
pub mod cycle_time;
pub mod delete;
pub mod import;
pub mod label;
pub mod version;
