//! Error type for the import and maintenance workflows.

use std::path::{Path, PathBuf};

use shortcut_api::ApiError;
use shortcut_config::ConfigError;

/// Errors that abort a workflow.
///
/// Per-record problems (a story that fails to create, a file that fails to
/// upload) are not errors: they are written to the failure logs and the run
/// continues.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Pivotal dump database {}: {source}", path.display())]
    Database {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("ledger not found: {} (nothing has been imported yet?)", path.display())]
    MissingLedger { path: PathBuf },

    #[error("Slack notification failed: {0}")]
    Slack(String),
}

/// Convenience alias for workflow results.
pub type Result<T> = std::result::Result<T, ImportError>;

impl ImportError {
    // -- Constructors --------------------------------------------------------

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn database(path: &Path, source: rusqlite::Error) -> Self {
        Self::Database {
            path: path.to_path_buf(),
            source,
        }
    }

    // -- Predicates ----------------------------------------------------------

    /// Returns `true` if the underlying API rejected the token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_unauthorized())
    }
}
