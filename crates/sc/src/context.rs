//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds the global flags and knows how to load the
//! configuration and build the API client a command runs against.

use std::path::PathBuf;

use anyhow::{Context, Result};
use shortcut_api::{DryRunApi, HttpClient, RetryPolicy, ShortcutApi};
use shortcut_config::{CookbookConfig, load_config};

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Configuration file path.
    pub config_path: PathBuf,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: only warnings and errors are logged.
    pub quiet: bool,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    pub fn from_global_args(global: &GlobalArgs) -> Self {
        Self {
            config_path: global.config.clone(),
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
        }
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    /// Loads the configuration file merged with the environment.
    pub fn load_config(&self) -> Result<CookbookConfig> {
        load_config(&self.config_path)
            .with_context(|| format!("failed to load {}", self.config_path.display()))
    }

    /// Builds the HTTP client; fails when no API token is configured.
    pub fn http_client(&self, config: &CookbookConfig) -> Result<HttpClient> {
        let token = config.api_token()?;
        let retry = RetryPolicy::new(config.max_retries, config.retry_base_delay());
        Ok(HttpClient::new(config.api_base_url.clone(), token).with_retry_policy(retry))
    }

    /// Runs `f` against the live API when `apply` is set, and against a
    /// [`DryRunApi`] wrapper otherwise.
    pub fn with_api<T>(
        &self,
        config: &CookbookConfig,
        apply: bool,
        f: impl FnOnce(&dyn ShortcutApi) -> T,
    ) -> Result<T> {
        let client = self.http_client(config)?;
        if apply {
            Ok(f(&client))
        } else {
            Ok(f(&DryRunApi::new(client)))
        }
    }
}
