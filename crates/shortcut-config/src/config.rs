//! Configuration types and loading for the Shortcut cookbook.
//!
//! The main entry point is [`CookbookConfig`], loaded with [`load_config`]
//! from built-in defaults, an optional `config.json`, and `SHORTCUT_*`
//! environment variables (highest priority). The API token normally comes
//! from `SHORTCUT_API_TOKEN`.

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Prefix of the environment variables merged into the configuration.
pub const ENV_PREFIX: &str = "SHORTCUT_";

/// Name of the environment variable holding the API token.
pub const TOKEN_ENV: &str = "SHORTCUT_API_TOKEN";

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration sources could not be merged or deserialized.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// The API token is not set.
    #[error("SHORTCUT_API_TOKEN environment variable is not set")]
    MissingToken,

    /// A key required by the running workflow is not set.
    #[error("missing configuration value '{key}' (set it in config.json or SHORTCUT_{env})")]
    Missing {
        /// The configuration key.
        key: &'static str,
        /// The environment variable suffix.
        env: &'static str,
    },

    /// A mapping CSV could not be read or parsed.
    #[error("failed to read {}: {source}", .path.display())]
    Csv {
        /// The CSV file.
        path: PathBuf,
        /// The underlying CSV error.
        source: csv::Error,
    },

    /// A mapping CSV lacks a required column.
    #[error("{} has no '{column}' column", .path.display())]
    MissingColumn {
        /// The CSV file.
        path: PathBuf,
        /// The expected column header.
        column: String,
    },

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Invalid(Box::new(e))
    }
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The cookbook configuration.
///
/// All fields have defaults so a partial `config.json` (or none at all)
/// deserializes; workflows call the `require_*` accessors for the values
/// they cannot run without.
#[derive(Clone, Serialize, Deserialize)]
pub struct CookbookConfig {
    /// Shortcut API token. Normally set through `SHORTCUT_API_TOKEN`.
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,

    /// Base URL of the Shortcut REST API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Team (group) UUID assigned to imported stories and epics.
    #[serde(default)]
    pub group_id: Option<String>,

    /// The Pivotal Tracker CSV export.
    #[serde(default = "default_pt_csv_file")]
    pub pt_csv_file: PathBuf,

    /// Mapping of Pivotal priorities to custom field value ids.
    #[serde(default = "default_priorities_csv_file")]
    pub priorities_csv_file: PathBuf,

    /// UUID of the Priority custom field.
    #[serde(default)]
    pub priority_custom_field_id: Option<String>,

    /// Mapping of Pivotal users to Shortcut member emails.
    #[serde(default = "default_users_csv_file")]
    pub users_csv_file: PathBuf,

    /// Mapping of Pivotal states to Shortcut workflow state ids.
    #[serde(default = "default_states_csv_file")]
    pub states_csv_file: PathBuf,

    /// Directory holding ledgers, failure reports and attachment folders.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// SQLite dump of the Pivotal project, used for comment attachments.
    #[serde(default = "default_pivotal_dump_db")]
    pub pivotal_dump_db: PathBuf,

    /// Stories per bulk request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between successful deletions, in milliseconds.
    #[serde(default = "default_delete_delay_ms")]
    pub delete_delay_ms: u64,

    /// How many times a rate-limited request is retried.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff when the API does not send `Retry-After`, in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_api_base_url() -> String {
    "https://api.app.shortcut.com/api/v3".to_string()
}

fn default_pt_csv_file() -> PathBuf {
    PathBuf::from("data/pivotal_export.csv")
}

fn default_priorities_csv_file() -> PathBuf {
    PathBuf::from("data/priorities.csv")
}

fn default_users_csv_file() -> PathBuf {
    PathBuf::from("data/users.csv")
}

fn default_states_csv_file() -> PathBuf {
    PathBuf::from("data/states.csv")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_pivotal_dump_db() -> PathBuf {
    PathBuf::from("pivotal_dump.db")
}

fn default_batch_size() -> usize {
    100
}

fn default_delete_delay_ms() -> u64 {
    500
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    2000
}

impl Default for CookbookConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            api_base_url: default_api_base_url(),
            group_id: None,
            pt_csv_file: default_pt_csv_file(),
            priorities_csv_file: default_priorities_csv_file(),
            priority_custom_field_id: None,
            users_csv_file: default_users_csv_file(),
            states_csv_file: default_states_csv_file(),
            data_dir: default_data_dir(),
            pivotal_dump_db: default_pivotal_dump_db(),
            batch_size: default_batch_size(),
            delete_delay_ms: default_delete_delay_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl fmt::Debug for CookbookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookbookConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("group_id", &self.group_id)
            .field("pt_csv_file", &self.pt_csv_file)
            .field("priorities_csv_file", &self.priorities_csv_file)
            .field("priority_custom_field_id", &self.priority_custom_field_id)
            .field("users_csv_file", &self.users_csv_file)
            .field("states_csv_file", &self.states_csv_file)
            .field("data_dir", &self.data_dir)
            .field("pivotal_dump_db", &self.pivotal_dump_db)
            .field("batch_size", &self.batch_size)
            .field("delete_delay_ms", &self.delete_delay_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Helper methods on CookbookConfig
// ---------------------------------------------------------------------------

impl CookbookConfig {
    /// Returns the API token, failing when it is unset or blank.
    pub fn api_token(&self) -> Result<&str> {
        match self.api_token.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(ConfigError::MissingToken),
        }
    }

    /// Returns the team UUID, failing when it is unset.
    pub fn require_group_id(&self) -> Result<&str> {
        self.group_id
            .as_deref()
            .filter(|g| !g.is_empty())
            .ok_or(ConfigError::Missing {
                key: "group_id",
                env: "GROUP_ID",
            })
    }

    /// Pause between successful deletions.
    pub fn delete_delay(&self) -> Duration {
        Duration::from_millis(self.delete_delay_ms)
    }

    /// First rate-limit backoff.
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Ledger of every entity created by the importer.
    pub fn imported_entities_csv(&self) -> PathBuf {
        self.data_dir.join("shortcut_imported_entities.csv")
    }

    /// Ledger of external-id comments.
    pub fn story_external_ids_csv(&self) -> PathBuf {
        self.data_dir.join("story_external_ids.csv")
    }

    /// Report of stories that could not be created.
    pub fn failed_stories_csv(&self) -> PathBuf {
        self.data_dir.join("failed_stories.csv")
    }

    /// Report of attachments that could not be uploaded.
    pub fn failed_files_csv(&self) -> PathBuf {
        self.data_dir.join("failed_files.csv")
    }

    /// Checks values that would otherwise fail deep inside a workflow.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "batch_size".into(),
                reason: "must be at least 1".into(),
            });
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "api_base_url".into(),
                reason: format!("'{}' is not an http(s) URL", self.api_base_url),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load configuration from defaults, `path` (if it exists) and the environment.
///
/// A missing file is not an error: every value can also come from a
/// `SHORTCUT_*` environment variable.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the file is not valid JSON or a value
/// has the wrong type, and [`ConfigError::InvalidValue`] if a value is out of
/// range.
pub fn load_config(path: &Path) -> Result<CookbookConfig> {
    let mut figment = Figment::from(Serialized::defaults(CookbookConfig::default()));
    if path.exists() {
        tracing::debug!("loading configuration from {}", path.display());
        figment = figment.merge(Json::file(path));
    } else {
        tracing::debug!("{} not found; using defaults and environment", path.display());
    }
    let config: CookbookConfig = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let cfg = CookbookConfig::default();
        assert!(cfg.api_token.is_none());
        assert_eq!(cfg.batch_size, 100);
        assert_eq!(cfg.delete_delay(), Duration::from_millis(500));
        assert_eq!(
            cfg.imported_entities_csv(),
            PathBuf::from("data/shortcut_imported_entities.csv")
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults_and_env() {
        Jail::expect_with(|jail| {
            jail.set_env("SHORTCUT_API_TOKEN", "secret");
            let cfg = load_config(Path::new("does-not-exist.json")).expect("config");
            assert_eq!(cfg.api_token().expect("token"), "secret");
            assert_eq!(cfg.api_base_url, "https://api.app.shortcut.com/api/v3");
            Ok(())
        });
    }

    #[test]
    fn test_file_values_and_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.json",
                r#"{"group_id": "g-1", "batch_size": 25, "priority_custom_field_id": "f-1"}"#,
            )?;
            jail.set_env("SHORTCUT_BATCH_SIZE", "10");
            let cfg = load_config(Path::new("config.json")).expect("config");
            assert_eq!(cfg.require_group_id().expect("group"), "g-1");
            assert_eq!(cfg.batch_size, 10);
            assert_eq!(cfg.priority_custom_field_id.as_deref(), Some("f-1"));
            Ok(())
        });
    }

    #[test]
    fn test_blank_token_is_missing() {
        let cfg = CookbookConfig {
            api_token: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(cfg.api_token(), Err(ConfigError::MissingToken)));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let cfg = CookbookConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let cfg = CookbookConfig {
            api_token: Some("very-secret".into()),
            ..Default::default()
        };
        let out = format!("{:?}", cfg);
        assert!(!out.contains("very-secret"));
        assert!(out.contains("<redacted>"));
    }
}
